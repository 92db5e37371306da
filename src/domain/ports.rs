use crate::domain::model::{CanonicalPhone, RawRecipient};
use crate::utils::error::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single send. Never aborts a dispatch run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("rejected by channel (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// The external delivery primitive. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &CanonicalPhone, body: &str) -> std::result::Result<(), SendError>;
}

/// Operator confirmation before anything is sent.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

pub trait CampaignSource: Send + Sync {
    fn load_recipients(&self) -> impl std::future::Future<Output = Result<Vec<RawRecipient>>> + Send;
    fn load_template(&self) -> impl std::future::Future<Output = Result<String>> + Send;
}
