pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::AppConfig;

pub use adapters::{build_sender, AutoConfirm, FileCampaignSource, HttpSender, TerminalConfirmer};
pub use core::campaign::{Campaign, CampaignOutcome};
pub use core::dispatcher::{DispatchConfig, Dispatcher, Progress};
pub use core::validator::{RecipientValidator, ValidationOutcome};
pub use domain::model::{DispatchReport, DispatchStatus, RawRecipient, Recipient};
pub use utils::error::{BlastError, Result};
