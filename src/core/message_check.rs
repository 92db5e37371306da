/// Byte length above which the SMS transport splits a message.
pub const SMS_BYTE_LIMIT: usize = 140;

/// Advisory findings about a template. Nothing here blocks a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCheckReport {
    pub byte_len: usize,
    /// First run of consecutive non-ASCII characters, if any.
    pub non_ascii: Option<String>,
}

impl MessageCheckReport {
    pub fn is_ascii(&self) -> bool {
        self.non_ascii.is_none()
    }

    pub fn exceeds_limit(&self) -> bool {
        self.byte_len > SMS_BYTE_LIMIT
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(run) = &self.non_ascii {
            warnings.push(format!("Message contains non-ASCII characters \"{}\"", run));
        }
        if self.exceeds_limit() {
            warnings.push(format!(
                "Message is too long and will be split (Length: {}, Limit: {})",
                self.byte_len, SMS_BYTE_LIMIT
            ));
        }
        warnings
    }
}

/// Checks the raw template only; expanded placeholders are not re-measured.
pub fn check_message(template: &str) -> MessageCheckReport {
    let non_ascii = template
        .char_indices()
        .find(|(_, c)| !c.is_ascii())
        .map(|(start, _)| {
            template[start..]
                .chars()
                .take_while(|c| !c.is_ascii())
                .collect::<String>()
        });

    MessageCheckReport {
        byte_len: template.len(),
        non_ascii,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_ascii_message_only_warns_about_length() {
        let message = "a".repeat(141);
        let report = check_message(&message);
        assert!(report.is_ascii());
        assert!(report.exceeds_limit());
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn test_exactly_at_limit_is_fine() {
        let report = check_message(&"a".repeat(SMS_BYTE_LIMIT));
        assert!(!report.exceeds_limit());
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn test_single_non_ascii_character_is_flagged() {
        let report = check_message("Caf\u{e9} opens at 9");
        assert!(!report.is_ascii());
        assert_eq!(report.non_ascii.as_deref(), Some("\u{e9}"));
        assert!(!report.exceeds_limit());
    }

    #[test]
    fn test_reports_first_non_ascii_run_and_utf8_length() {
        let report = check_message("Hi \u{1f44b}\u{1f44b} from \u{e9}");
        assert_eq!(report.non_ascii.as_deref(), Some("\u{1f44b}\u{1f44b}"));
        assert_eq!(report.byte_len, "Hi ".len() + 8 + " from ".len() + 2);
    }
}
