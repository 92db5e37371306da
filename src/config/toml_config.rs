use crate::core::dispatcher::DispatchConfig;
use crate::core::estimate::PricingConfig;
use crate::core::phone::PhoneNormalizer;
use crate::utils::error::{BlastError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern compiles"));

/// Process-wide settings, loaded once at startup and passed down explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub pricing: PricingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub phone: PhoneConfig,
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub directory: String,
    #[serde(default = "default_recipients_file")]
    pub recipients_file: String,
    #[serde(default = "default_template_file")]
    pub template_file: String,
}

fn default_recipients_file() -> String {
    "phones.csv".to_string()
}

fn default_template_file() -> String {
    "template.txt".to_string()
}

impl DataConfig {
    pub fn recipients_path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.recipients_file)
    }

    pub fn template_path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.template_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneConfig {
    /// ISO 3166 region assumed for numbers without a country code.
    pub default_region: String,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            default_region: "US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    Http(HttpChannelConfig),
    Sns(SnsChannelConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpChannelConfig {
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnsChannelConfig {
    #[serde(default = "default_sms_type")]
    pub sms_type: String,
    pub usage_report_s3_bucket: Option<String>,
    pub region: Option<String>,
}

fn default_sms_type() -> String {
    "Transactional".to_string()
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BlastError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BlastError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PRICE_PER_MESSAGE_USD})；未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn phone_normalizer(&self) -> Result<PhoneNormalizer> {
        PhoneNormalizer::from_region_code(&self.phone.default_region)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("data.directory", &self.data.directory)?;
        validation::validate_file_extension(
            "data.recipients_file",
            &self.data.recipients_file,
            &["csv"],
        )?;
        validation::validate_path("data.template_file", &self.data.template_file)?;

        let price = self.pricing.price_per_message_usd;
        if !price.is_finite() || price < 0.0 {
            return Err(BlastError::InvalidConfigValueError {
                field: "pricing.price_per_message_usd".to_string(),
                value: price.to_string(),
                reason: "Price must be a non-negative number".to_string(),
            });
        }

        validation::validate_positive_number("dispatch.concurrency", self.dispatch.concurrency, 1)?;
        validation::validate_positive_number("dispatch.batch_size", self.dispatch.batch_size, 1)?;
        validation::validate_range(
            "dispatch.batch_interval_ms",
            self.dispatch.batch_interval_ms,
            1,
            3_600_000,
        )?;

        self.phone_normalizer()?;

        match &self.channel {
            ChannelConfig::Http(http) => {
                validation::validate_url("channel.endpoint", &http.endpoint)?;
                if let Some(timeout) = http.timeout_seconds {
                    validation::validate_range("channel.timeout_seconds", timeout, 1, 300)?;
                }
            }
            ChannelConfig::Sns(sns) => {
                if !matches!(sns.sms_type.as_str(), "Transactional" | "Promotional") {
                    return Err(BlastError::InvalidConfigValueError {
                        field: "channel.sms_type".to_string(),
                        value: sns.sms_type.clone(),
                        reason: "Must be Transactional or Promotional".to_string(),
                    });
                }
                if let Some(bucket) = &sns.usage_report_s3_bucket {
                    validation::validate_s3_bucket_name("channel.usage_report_s3_bucket", bucket)?;
                }
                if let Some(region) = &sns.region {
                    validation::validate_aws_region("channel.region", region)?;
                }
            }
        }

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
