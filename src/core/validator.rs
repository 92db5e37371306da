use crate::core::phone::PhoneNormalizer;
use crate::domain::model::{CanonicalPhone, RawRecipient, Recipient};
use crate::utils::error::{BlastError, Result};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    /// Unique recipients in first-seen order.
    pub recipients: Vec<Recipient>,
    /// Number of dropped rows whose phone was already accepted.
    pub duplicate_count: usize,
    pub duplicates_by_phone: BTreeMap<CanonicalPhone, usize>,
}

/// Validates raw rows and removes duplicate phones.
///
/// A row with a missing or unparseable phone aborts the whole validation;
/// repeated numbers are dropped and counted.
#[derive(Debug, Clone, Default)]
pub struct RecipientValidator {
    normalizer: PhoneNormalizer,
}

impl RecipientValidator {
    pub fn new(normalizer: PhoneNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn validate(&self, raw: Vec<RawRecipient>) -> Result<ValidationOutcome> {
        tracing::info!(
            "ℹ️ Phone numbers without an international country code are assumed to be in {:?}",
            self.normalizer.default_region()
        );
        tracing::info!("🔬 Validating {} recipients...", raw.len());

        let mut outcome = ValidationOutcome::default();
        let mut seen: HashSet<CanonicalPhone> = HashSet::with_capacity(raw.len());

        for (row, record) in raw.into_iter().enumerate() {
            let Some(phone_text) = record.phone_text() else {
                return Err(BlastError::MissingPhone {
                    row,
                    record: serde_json::to_string(&record.fields)?,
                });
            };

            let phone = self
                .normalizer
                .normalize(&phone_text)
                .map_err(|e| BlastError::InvalidPhone {
                    row,
                    value: e.input,
                })?;

            // 重複號碼：保留第一筆，其餘只計數
            if !seen.insert(phone.clone()) {
                tracing::debug!("Row {} duplicates {}, skipping", row, phone);
                outcome.duplicate_count += 1;
                *outcome.duplicates_by_phone.entry(phone).or_insert(0) += 1;
                continue;
            }

            outcome.recipients.push(Recipient::new(phone, record.fields));
        }

        tracing::info!("✅ All phone numbers normalized");
        if outcome.duplicate_count > 0 {
            tracing::warn!(
                "⚠️ Dropped {} duplicate rows across {} phone numbers",
                outcome.duplicate_count,
                outcome.duplicates_by_phone.len()
            );
        }
        tracing::info!(
            "✅ Recipient validation passed ({} unique)",
            outcome.recipients.len()
        );

        Ok(outcome)
    }
}
