use crate::domain::model::CanonicalPhone;
use crate::utils::error::{BlastError, Result};
use phonenumber::country;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid phone number: {input}")]
pub struct InvalidPhone {
    pub input: String,
}

/// Turns free-form phone strings into E.164.
///
/// Numbers without an explicit `+<country code>` are read in the default
/// region's numbering plan (North America unless configured otherwise).
#[derive(Debug, Clone)]
pub struct PhoneNormalizer {
    default_region: country::Id,
}

impl Default for PhoneNormalizer {
    fn default() -> Self {
        Self::new(country::Id::US)
    }
}

impl PhoneNormalizer {
    pub fn new(default_region: country::Id) -> Self {
        Self { default_region }
    }

    /// 以 ISO 3166 兩碼區域建立，例如 `US`、`GB`
    pub fn from_region_code(code: &str) -> Result<Self> {
        code.trim()
            .to_ascii_uppercase()
            .parse::<country::Id>()
            .map(Self::new)
            .map_err(|_| BlastError::InvalidConfigValueError {
                field: "phone.default_region".to_string(),
                value: code.to_string(),
                reason: "Unknown ISO 3166 region code".to_string(),
            })
    }

    pub fn default_region(&self) -> country::Id {
        self.default_region
    }

    pub fn normalize(&self, raw: &str) -> std::result::Result<CanonicalPhone, InvalidPhone> {
        let trimmed = raw.trim();
        let invalid = || InvalidPhone {
            input: trimmed.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let parsed = phonenumber::parse(Some(self.default_region), trimmed).map_err(|_| invalid())?;
        if !phonenumber::is_valid(&parsed) {
            return Err(invalid());
        }

        let e164 = phonenumber::format(&parsed)
            .mode(phonenumber::Mode::E164)
            .to_string();
        Ok(CanonicalPhone::new(e164))
    }
}
