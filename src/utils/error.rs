use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlastError {
    #[error("Row {row} has missing phone number: {record}")]
    MissingPhone { row: usize, record: String },

    #[error("Row {row} has invalid phone number \"{value}\"")]
    InvalidPhone { row: usize, value: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} (\"{value}\"): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Delivery channel error: {message}")]
    ChannelError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Configuration,
    System,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BlastError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingPhone { .. } | Self::InvalidPhone { .. } | Self::CsvError(_) => {
                ErrorCategory::Data
            }
            Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
            Self::HttpClientError(_) | Self::ChannelError { .. } => ErrorCategory::Channel,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Channel | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 行程結束碼：資料錯誤 1、配置錯誤 2、系統錯誤 3
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Data => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::Channel | ErrorCategory::System => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingPhone { .. } => "Fill in the phone column for that row or remove the row",
            Self::InvalidPhone { .. } => {
                "Fix the number or add an explicit +<country code> prefix"
            }
            Self::CsvError(_) => "Check that the recipient file is valid CSV with a header row",
            Self::IoError(_) => "Check that the data directory and files exist and are readable",
            Self::SerializationError(_) => "Check the report output path and disk space",
            Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Review the TOML configuration file and command line overrides"
            }
            Self::HttpClientError(_) | Self::ChannelError { .. } => {
                "Check the delivery channel settings and credentials"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Data => format!("Recipient validation failed. {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration. {}", self),
            ErrorCategory::System => format!("System error. {}", self),
            ErrorCategory::Channel => format!("Delivery channel unavailable. {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BlastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_abort_with_exit_code_one() {
        let err = BlastError::InvalidPhone {
            row: 3,
            value: "12".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Row 3 has invalid phone number \"12\"");
    }

    #[test]
    fn test_config_errors_map_to_exit_code_two() {
        let err = BlastError::MissingConfigError {
            field: "channel.endpoint".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
        assert!(err.user_friendly_message().contains("channel.endpoint"));
    }
}
