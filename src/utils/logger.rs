use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RUST_LOG 優先，否則只開本 crate 的日誌
fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "sms_blast=debug,info" } else { "sms_blast=info" })
    })
}

fn quiet_layer<S>() -> fmt::Layer<S> {
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(quiet_layer().compact())
        .init();
}

/// JSON 格式，方便匯入日誌系統
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(quiet_layer().json())
        .init();
}
