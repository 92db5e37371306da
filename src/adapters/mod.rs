// Adapters layer: concrete implementations of the domain ports (files, delivery channels, terminal).

pub mod file_source;
pub mod http_sender;
pub mod prompt;
pub mod report;
#[cfg(feature = "sns")]
pub mod sns_sender;

pub use file_source::FileCampaignSource;
pub use http_sender::HttpSender;
pub use prompt::{AutoConfirm, LineConfirmer, TerminalConfirmer};
#[cfg(feature = "sns")]
pub use sns_sender::SnsSender;

use crate::config::ChannelConfig;
use crate::domain::ports::MessageSender;
use crate::utils::error::Result;
use std::sync::Arc;

/// Builds the delivery channel named in the configuration.
pub async fn build_sender(config: &ChannelConfig) -> Result<Arc<dyn MessageSender>> {
    match config {
        ChannelConfig::Http(http) => {
            tracing::info!("📡 HTTP channel: {}", http.endpoint);
            Ok(Arc::new(HttpSender::new(http)?))
        }
        #[cfg(feature = "sns")]
        ChannelConfig::Sns(sns) => Ok(Arc::new(SnsSender::connect(sns).await?)),
        #[cfg(not(feature = "sns"))]
        ChannelConfig::Sns(_) => Err(crate::utils::error::BlastError::ChannelError {
            message: "this build does not include the `sns` feature".to_string(),
        }),
    }
}
