use crate::cli::TracingFormat;
use crate::config::Config;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build the default filter: everything at warn, this crate at `log_level`,
/// and per-statement sqlx logging kept quiet.
fn default_filter(log_level: &str) -> EnvFilter {
    EnvFilter::new(format!("warn,showsync={log_level},sqlx::query=warn"))
}

/// Configure and initialize logging for the application.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn setup_logging(config: &Config, tracing_format: TracingFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));

    match tracing_format {
        TracingFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).compact())
                .init();
        }
        TracingFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .json()
                        .flatten_event(true)
                        .with_current_span(true),
                )
                .init();
        }
    }
}
