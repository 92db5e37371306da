use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Average time a single send takes, used for the duration estimate.
pub const DEFAULT_AVERAGE_SEND_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub price_per_message_usd: f64,
    #[serde(default = "default_average_send_ms")]
    pub average_send_ms: u64,
}

fn default_average_send_ms() -> u64 {
    DEFAULT_AVERAGE_SEND_MS
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub message_count: usize,
    pub total_price_usd: f64,
    pub estimated_duration: Duration,
}

impl CostEstimate {
    pub fn confirmation_prompt(&self) -> String {
        format!(
            "About to send {} messages\n⏰ Estimated send time: {:.1}s\n💸 Estimated price to send: {}\nReady to send? [y/n]",
            self.message_count,
            self.estimated_duration.as_secs_f64(),
            format_usd(self.total_price_usd)
        )
    }
}

/// Dollar amount with at least two decimals, keeping sub-cent digits
/// (per-message prices are often fractions of a cent).
pub fn format_usd(amount: f64) -> String {
    let text = format!("{:.6}", amount);
    let trimmed = text.trim_end_matches('0');
    let (whole, cents) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    format!("${}.{:0<2}", whole, cents)
}

pub fn estimate(message_count: usize, pricing: &PricingConfig) -> CostEstimate {
    CostEstimate {
        message_count,
        total_price_usd: message_count as f64 * pricing.price_per_message_usd,
        estimated_duration: Duration::from_millis(pricing.average_send_ms * message_count as u64),
    }
}
