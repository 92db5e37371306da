use crate::core::dispatcher::{Dispatcher, Progress};
use crate::core::estimate::{estimate, format_usd, CostEstimate, PricingConfig};
use crate::core::message_check::{check_message, SMS_BYTE_LIMIT};
use crate::core::validator::RecipientValidator;
use crate::domain::model::DispatchReport;
use crate::domain::ports::{CampaignSource, Confirmer};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long to wait for the progress logger to catch up after dispatch.
const PROGRESS_DRAIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum CampaignOutcome {
    /// Stopped after the estimate because of `--dry-run`.
    DryRun(CostEstimate),
    /// The operator declined; nothing was sent.
    Cancelled(CostEstimate),
    Completed(DispatchReport),
}

/// Runs one campaign: validate, check, estimate, confirm, dispatch.
pub struct Campaign<S: CampaignSource> {
    source: S,
    validator: RecipientValidator,
    dispatcher: Dispatcher,
    confirmer: Arc<dyn Confirmer>,
    pricing: PricingConfig,
    dry_run: bool,
}

impl<S: CampaignSource> Campaign<S> {
    pub fn new(
        source: S,
        validator: RecipientValidator,
        dispatcher: Dispatcher,
        confirmer: Arc<dyn Confirmer>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            source,
            validator,
            dispatcher,
            confirmer,
            pricing,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> Result<CampaignOutcome> {
        tracing::info!("🏎 Start!");

        let template = self.source.load_template().await?;
        let raw = self.source.load_recipients().await?;
        tracing::info!(
            "📂 Found {} recipient{}",
            raw.len(),
            if raw.len() == 1 { "" } else { "s" }
        );

        // 資料錯誤直接中止，尚未送出任何訊息
        let validation = self.validator.validate(raw)?;

        tracing::info!("🔬 Checking message...");
        tracing::info!("ℹ️ \"{}\"", template);
        let check = check_message(&template);
        for warning in check.warnings() {
            tracing::warn!("❗️ {}", warning);
        }
        if check.is_ascii() {
            tracing::info!("✅ Message is ASCII only");
        }
        tracing::info!(
            "✅ Message byte length is {} (Limit is {})",
            check.byte_len,
            SMS_BYTE_LIMIT
        );
        tracing::info!("✅ All validations passed");

        let estimate = estimate(validation.recipients.len(), &self.pricing);
        tracing::info!(
            "⏰ Estimated send time: {:.1}s",
            estimate.estimated_duration.as_secs_f64()
        );
        tracing::info!("💸 Estimated price to send: {}", format_usd(estimate.total_price_usd));

        if self.dry_run {
            tracing::info!("🔍 DRY RUN MODE - no messages will be sent");
            return Ok(CampaignOutcome::DryRun(estimate));
        }

        if !self
            .confirmer
            .confirm(&estimate.confirmation_prompt())
            .await?
        {
            tracing::warn!("💥 Cancelled.");
            return Ok(CampaignOutcome::Cancelled(estimate));
        }

        let mut progress_log = tokio::spawn(log_progress(self.dispatcher.subscribe()));
        let report = self
            .dispatcher
            .dispatch(&template, validation.recipients)
            .await;
        // 最後一筆進度可能還沒記錄，給它一點時間
        if tokio::time::timeout(PROGRESS_DRAIN, &mut progress_log)
            .await
            .is_err()
        {
            progress_log.abort();
        }

        Ok(CampaignOutcome::Completed(report))
    }
}

/// Logs every completed 10% step until the run is done. Returns the last
/// snapshot it logged.
async fn log_progress(mut progress: watch::Receiver<Progress>) -> Option<Progress> {
    let mut last_step = 0;
    let mut last_logged = None;
    while progress.changed().await.is_ok() {
        let snapshot = *progress.borrow_and_update();
        let step = snapshot.percent() / 10;
        if step > last_step {
            last_step = step;
            last_logged = Some(snapshot);
            tracing::info!(
                "📨 {}/{} ({}%) sent={} failed={}",
                snapshot.completed,
                snapshot.total,
                snapshot.percent(),
                snapshot.sent,
                snapshot.failed
            );
        }
        if snapshot.is_done() {
            break;
        }
    }
    last_logged
}
