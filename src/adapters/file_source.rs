use crate::domain::model::{FieldMap, RawRecipient, PHONE_FIELD};
use crate::domain::ports::CampaignSource;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Recipients CSV and template text file on local disk.
#[derive(Debug, Clone)]
pub struct FileCampaignSource {
    recipients_path: PathBuf,
    template_path: PathBuf,
}

impl FileCampaignSource {
    pub fn new(recipients_path: impl Into<PathBuf>, template_path: impl Into<PathBuf>) -> Self {
        Self {
            recipients_path: recipients_path.into(),
            template_path: template_path.into(),
        }
    }
}

impl CampaignSource for FileCampaignSource {
    async fn load_recipients(&self) -> Result<Vec<RawRecipient>> {
        tracing::info!(
            "🌀 Reading recipient CSV file ({})",
            self.recipients_path.display()
        );
        let data = tokio::fs::read(&self.recipients_path).await?;
        parse_recipients(&data)
    }

    async fn load_template(&self) -> Result<String> {
        tracing::debug!("Reading template from {}", self.template_path.display());
        let content = tokio::fs::read_to_string(&self.template_path).await?;
        Ok(strip_trailing_newline(content))
    }
}

/// Parses a header-first CSV into raw recipients.
///
/// Cells are typed the way a spreadsheet import would type them; the phone
/// column always stays text.
pub fn parse_recipients(data: &[u8]) -> Result<Vec<RawRecipient>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut recipients = Vec::new();

    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let fields: FieldMap = headers
            .iter()
            .zip(row.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, cell)| {
                let value = if name == PHONE_FIELD {
                    serde_json::Value::String(cell.trim().to_string())
                } else {
                    typed_value(cell)
                };
                (name.to_string(), value)
            })
            .collect();
        recipients.push(RawRecipient::new(fields));
    }

    tracing::info!(
        "📂 Parsed {} recipient row{}",
        recipients.len(),
        if recipients.len() == 1 { "" } else { "s" }
    );
    Ok(recipients)
}

fn typed_value(cell: &str) -> serde_json::Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return serde_json::Value::Null;
    }

    // 前導零（郵遞區號等）保留為文字
    let leading_zero = trimmed.len() > 1
        && trimmed.trim_start_matches('-').starts_with('0')
        && !trimmed.trim_start_matches('-').starts_with("0.");
    if !leading_zero {
        if let Ok(int) = trimmed.parse::<i64>() {
            return int.into();
        }
        if let Some(number) = trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return serde_json::Value::Number(number);
        }
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return serde_json::Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return serde_json::Value::Bool(false);
    }

    serde_json::Value::String(cell.to_string())
}

fn strip_trailing_newline(mut content: String) -> String {
    if content.ends_with('\n') {
        content.pop();
        if content.ends_with('\r') {
            content.pop();
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_recipients_types_cells() {
        let csv = "phone,name,seats,price,vip,zip,note\n\
                   4155552671,Ann,2,29.99,true,02134,\n\
                   +44 7400 123456,Bob,1,5,FALSE,90210,late\n";
        let rows = parse_recipients(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        let ann = &rows[0].fields;
        assert_eq!(ann["phone"], json!("4155552671"));
        assert_eq!(ann["name"], json!("Ann"));
        assert_eq!(ann["seats"], json!(2));
        assert_eq!(ann["price"], json!(29.99));
        assert_eq!(ann["vip"], json!(true));
        assert_eq!(ann["zip"], json!("02134"));
        assert_eq!(ann["note"], serde_json::Value::Null);

        let bob = &rows[1].fields;
        assert_eq!(bob["phone"], json!("+44 7400 123456"));
        assert_eq!(bob["vip"], json!(false));
        assert_eq!(bob["zip"], json!(90210));
    }

    #[test]
    fn test_blank_lines_and_short_rows() {
        let csv = "phone,name\n4155552671,Ann\n\n2125551234\n";
        let rows = parse_recipients(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(!rows[1].fields.contains_key("name"));
    }

    #[test]
    fn test_missing_phone_column_still_parses() {
        let rows = parse_recipients(b"name\nAnn\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].phone_text(), None);
    }

    #[tokio::test]
    async fn test_file_source_reads_both_files() {
        let mut recipients = NamedTempFile::new().unwrap();
        recipients.write_all(b"phone,name\n415-555-2671,Ann\n").unwrap();
        let mut template = NamedTempFile::new().unwrap();
        template.write_all(b"Hi {name}\r\n").unwrap();

        let source = FileCampaignSource::new(recipients.path(), template.path());

        let rows = source.load_recipients().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(source.load_template().await.unwrap(), "Hi {name}");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = FileCampaignSource::new("/nonexistent/phones.csv", "/nonexistent/t.txt");
        let err = source.load_recipients().await.unwrap_err();
        assert!(matches!(err, crate::utils::error::BlastError::IoError(_)));
    }
}
