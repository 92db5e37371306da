use crate::domain::model::{DispatchFailure, DispatchReport, PHONE_FIELD};
use crate::utils::error::Result;
use std::collections::BTreeSet;
use std::path::Path;

pub fn write_report_json(path: &Path, report: &DispatchReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!("📝 Report written to {}", path.display());
    Ok(())
}

/// Writes failed recipients with every field plus an `error` column, so the
/// file can be fed back in as a recipient list.
pub fn write_failures_csv(path: &Path, failures: &[DispatchFailure]) -> Result<()> {
    let columns: BTreeSet<&str> = failures
        .iter()
        .flat_map(|f| f.recipient.fields().keys().map(String::as_str))
        .filter(|name| *name != PHONE_FIELD)
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![PHONE_FIELD];
    header.extend(columns.iter().copied());
    header.push("error");
    writer.write_record(&header)?;

    for failure in failures {
        let mut row = vec![failure.recipient.phone().as_str().to_string()];
        for column in &columns {
            row.push(
                failure
                    .recipient
                    .field(column)
                    .map(cell_text)
                    .unwrap_or_default(),
            );
        }
        row.push(failure.error.clone());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    tracing::info!(
        "📝 {} failed recipients written to {}",
        failures.len(),
        path.display()
    );
    Ok(())
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_source::parse_recipients;
    use crate::core::validator::RecipientValidator;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn report_with_failure() -> DispatchReport {
        let raw = parse_recipients(b"phone,name,seats\n415-555-2671,Ann,2\n212-555-1234,Bob,\n").unwrap();
        let mut recipients = RecipientValidator::default().validate(raw).unwrap().recipients;
        let bob = recipients.remove(1);
        let now = Utc::now();
        DispatchReport {
            attempted: 2,
            sent: 1,
            failed: 1,
            batches: 1,
            started_at: now,
            finished_at: now,
            elapsed: Duration::from_millis(12),
            failures: vec![DispatchFailure {
                index: 1,
                recipient: bob,
                error: "rejected by channel (status 400): opted out".to_string(),
            }],
        }
    }

    #[test]
    fn test_failures_csv_can_be_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failures.csv");
        let report = report_with_failure();

        write_failures_csv(&path, &report.failures).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("phone,name,seats,error"));
        assert_eq!(
            lines.next(),
            Some("+12125551234,Bob,,rejected by channel (status 400): opted out")
        );

        let reloaded = parse_recipients(content.as_bytes()).unwrap();
        assert_eq!(reloaded[0].phone_text().as_deref(), Some("+12125551234"));
    }

    #[test]
    fn test_report_json_contains_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        write_report_json(&path, &report_with_failure()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["sent"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["failures"][0]["recipient"]["phone"], "+12125551234");
        assert_eq!(json["failures"][0]["recipient"]["fields"]["name"], "Bob");
    }
}
