use crate::config::{AgentConfig, LogFormat};
use std::io;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Install the process-wide tracing subscriber. Logs go to stderr so stdout
/// stays a clean JSON-lines data stream.
pub fn init_tracing(config: &AgentConfig) {
    if config.no_logs {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_new(&config.log_level)
            .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_LEVEL));
        let result = match config.log_format {
            LogFormat::Json => {
                let subscriber = tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(io::stderr)
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
            }
            LogFormat::Text => {
                let subscriber = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(io::stderr)
                    .with_target(false)
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
            }
        };
        if result.is_err() {
            eprintln!("soundwatch: tracing subscriber already installed");
        }
    });
}
