pub mod campaign;
pub mod dispatcher;
pub mod estimate;
pub mod message_check;
pub mod phone;
pub mod render;
pub mod validator;

pub use crate::domain::model::{DispatchReport, RawRecipient, Recipient};
pub use crate::domain::ports::{CampaignSource, Confirmer, MessageSender, SendError};
pub use crate::utils::error::Result;
