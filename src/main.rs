use anyhow::Context;
use clap::Parser;
use sms_blast::adapters::report;
use sms_blast::core::estimate::format_usd;
use sms_blast::domain::ports::Confirmer;
use sms_blast::utils::{logger, validation::Validate};
use sms_blast::{
    build_sender, AppConfig, AutoConfirm, BlastError, Campaign, CampaignOutcome, CliArgs,
    DispatchReport, DispatchStatus, Dispatcher, FileCampaignSource, RecipientValidator,
    TerminalConfirmer,
};
use std::sync::Arc;

const EXIT_CANCELLED: i32 = 4;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting sms-blast");
    tracing::info!("📁 Loading configuration from: {}", args.config.display());

    let mut config = match AppConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "❌ Failed to load config file '{}': {}",
                args.config.display(),
                e
            );
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(e.exit_code());
        }
    };
    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        report_error(&e);
        std::process::exit(e.exit_code());
    }
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    match run(&args, config).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let exit_code = match e.downcast_ref::<BlastError>() {
                Some(blast) => {
                    report_error(blast);
                    blast.exit_code()
                }
                None => {
                    tracing::error!("❌ {:#}", e);
                    eprintln!("❌ {:#}", e);
                    3
                }
            };
            eprintln!("💣 Exited with error. No further messages were sent.");
            std::process::exit(exit_code);
        }
    }
}

async fn run(args: &CliArgs, config: AppConfig) -> anyhow::Result<i32> {
    let sender = build_sender(&config.channel).await?;
    let confirmer: Arc<dyn Confirmer> = if args.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(TerminalConfirmer::stdin())
    };

    let source = FileCampaignSource::new(
        config.data.recipients_path(),
        config.data.template_path(),
    );
    let campaign = Campaign::new(
        source,
        RecipientValidator::new(config.phone_normalizer()?),
        Dispatcher::new(sender, config.dispatch),
        confirmer,
        config.pricing,
    )
    .with_dry_run(args.dry_run);

    match campaign.run().await? {
        CampaignOutcome::DryRun(estimate) => {
            println!(
                "🔍 Dry run: {} messages would be sent ({})",
                estimate.message_count,
                format_usd(estimate.total_price_usd)
            );
            Ok(0)
        }
        CampaignOutcome::Cancelled(_) => {
            println!("💥 Cancelled. No messages were sent.");
            Ok(EXIT_CANCELLED)
        }
        CampaignOutcome::Completed(report) => {
            print_summary(&report);
            if let Some(path) = &args.report_out {
                report::write_report_json(path, &report)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
            if let Some(path) = &args.failures_out {
                report::write_failures_csv(path, &report.failures)
                    .with_context(|| format!("writing failures to {}", path.display()))?;
            }
            tracing::info!("🌙 That's all, folks!");
            Ok(0)
        }
    }
}

fn print_summary(report: &DispatchReport) {
    let seconds = report.elapsed.as_secs_f64();
    match report.status() {
        DispatchStatus::FullySent => {
            println!("✅ All {} messages sent ({:.1}s)", report.sent, seconds);
        }
        DispatchStatus::SentWithFailures(failed) => {
            println!(
                "⚠️ Sent {} of {} messages with {} failures ({:.1}s)",
                report.sent, report.attempted, failed, seconds
            );
            for failure in &report.failures {
                println!(
                    "  #{} {}: {}",
                    failure.index,
                    failure.recipient.phone(),
                    failure.error
                );
            }
        }
    }
}

fn report_error(e: &BlastError) {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}
