use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Column that carries the destination number.
pub const PHONE_FIELD: &str = "phone";

pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// One row of the recipient source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecipient {
    pub fields: FieldMap,
}

impl RawRecipient {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// Phone cell as text; `None` when absent, null or blank.
    pub fn phone_text(&self) -> Option<String> {
        let text = match self.fields.get(PHONE_FIELD)? {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for RawRecipient {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// E.164 number (`+` followed by country code and subscriber digits).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPhone(String);

impl CanonicalPhone {
    pub(crate) fn new(e164: String) -> Self {
        Self(e164)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated recipient. The `phone` field always holds the canonical number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    phone: CanonicalPhone,
    fields: FieldMap,
}

impl Recipient {
    pub(crate) fn new(phone: CanonicalPhone, mut fields: FieldMap) -> Self {
        fields.insert(
            PHONE_FIELD.to_string(),
            serde_json::Value::String(phone.as_str().to_string()),
        );
        Self { phone, fields }
    }

    pub fn phone(&self) -> &CanonicalPhone {
        &self.phone
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub to: CanonicalPhone,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
}

/// A send that did not go through, with what is needed to retry it by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchFailure {
    /// Position in the validated recipient list.
    pub index: usize,
    pub recipient: Recipient,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    FullySent,
    SentWithFailures(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub batches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn status(&self) -> DispatchStatus {
        if self.failed == 0 {
            DispatchStatus::FullySent
        } else {
            DispatchStatus::SentWithFailures(self.failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phone_text_handles_numbers_and_blanks() {
        let numeric: RawRecipient = [("phone", json!(4155552671u64))].into_iter().collect();
        assert_eq!(numeric.phone_text().as_deref(), Some("4155552671"));

        let blank: RawRecipient = [("phone", json!("   "))].into_iter().collect();
        assert_eq!(blank.phone_text(), None);

        let null: RawRecipient = [("phone", serde_json::Value::Null)].into_iter().collect();
        assert_eq!(null.phone_text(), None);

        let absent: RawRecipient = [("name", json!("Ann"))].into_iter().collect();
        assert_eq!(absent.phone_text(), None);
    }

    #[test]
    fn test_recipient_phone_field_is_canonical() {
        let mut fields = FieldMap::new();
        fields.insert("phone".to_string(), json!("(415) 555-2671"));
        fields.insert("name".to_string(), json!("Ann"));

        let recipient = Recipient::new(CanonicalPhone::new("+14155552671".to_string()), fields);
        assert_eq!(recipient.field("phone"), Some(&json!("+14155552671")));
        assert_eq!(recipient.field("name"), Some(&json!("Ann")));
    }
}
