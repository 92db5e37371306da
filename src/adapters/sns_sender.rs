use crate::config::SnsChannelConfig;
use crate::domain::model::CanonicalPhone;
use crate::domain::ports::{MessageSender, SendError};
use crate::utils::error::{BlastError, Result};
use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client as SnsClient;

/// Publishes each message as an SMS through Amazon SNS.
#[derive(Debug, Clone)]
pub struct SnsSender {
    client: SnsClient,
}

impl SnsSender {
    /// Loads AWS credentials from the environment and applies the account SMS attributes.
    pub async fn connect(config: &SnsChannelConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let client = SnsClient::new(&loader.load().await);

        let mut attributes = client
            .set_sms_attributes()
            .attributes("DefaultSMSType", &config.sms_type);
        if let Some(bucket) = &config.usage_report_s3_bucket {
            attributes = attributes.attributes("UsageReportS3Bucket", bucket);
        }
        attributes
            .send()
            .await
            .map_err(|e| BlastError::ChannelError {
                message: format!("Failed to set SNS SMS attributes: {}", DisplayErrorContext(&e)),
            })?;

        tracing::info!("📡 SNS channel ready ({} SMS)", config.sms_type);
        Ok(Self { client })
    }
}

#[async_trait]
impl MessageSender for SnsSender {
    async fn send(&self, to: &CanonicalPhone, body: &str) -> std::result::Result<(), SendError> {
        let output = self
            .client
            .publish()
            .phone_number(to.as_str())
            .message(body)
            .send()
            .await
            .map_err(|e| SendError::Transport(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(
            "SNS accepted message for {} (id {})",
            to,
            output.message_id().unwrap_or("-")
        );
        Ok(())
    }
}
