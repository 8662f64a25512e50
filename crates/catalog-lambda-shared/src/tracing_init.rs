//! Tracing initialization for Lambda functions.
//!
//! Configures JSON-formatted tracing output suitable for CloudWatch Logs, or
//! human-readable output for local runs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize tracing for the process.
///
/// This should be called once at the start of the Lambda `main` function,
/// before calling `lambda_runtime::run()`. `RUST_LOG` takes precedence over
/// `config.level`.
///
/// # Example
///
/// ```no_run
/// use catalog_lambda_shared::{init_tracing, LoggingConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), lambda_runtime::Error> {
///     init_tracing(&LoggingConfig::from_env());
///     // ... rest of Lambda setup
///     Ok(())
/// }
/// ```
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => {
            registry.with(fmt::layer().pretty()).init();
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_current_span(false)
                .with_span_list(false)
                .flatten_event(true);

            registry.with(fmt_layer).init();
        }
    }
}
