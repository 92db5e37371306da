use crate::config::toml_config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sms-blast")]
#[command(about = "Validate a recipient list and send a templated SMS to each recipient")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "sms-blast.toml")]
    pub config: PathBuf,

    /// Override data.directory
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override dispatch.concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override dispatch.batch_size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Override dispatch.batch_interval_ms
    #[arg(long)]
    pub batch_interval_ms: Option<u64>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Validate and estimate only; send nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Write the dispatch report as JSON
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    /// Write failed recipients as CSV for a manual re-run
    #[arg(long)]
    pub failures_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl CliArgs {
    /// 命令列參數覆蓋檔案設定
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.data_dir {
            config.data.directory = dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.dispatch.concurrency = concurrency;
        }
        if let Some(batch_size) = self.batch_size {
            config.dispatch.batch_size = batch_size;
        }
        if let Some(interval) = self.batch_interval_ms {
            config.dispatch.batch_interval_ms = interval;
        }
    }
}
