//! Environment-driven configuration, read once at process start.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level filter (default: `info`)
//! - `LOG_FORMAT`: `json` (default) or `text`/`pretty`
//! - `SERVICE_NAME`: Service name in logs, falling back to
//!   `AWS_LAMBDA_FUNCTION_NAME`, then `catalog-lambda`
//! - `CATALOG_TIMEOUT_MARGIN_MS`: Time kept in reserve before the invocation
//!   deadline to send the timeout response (default: `250`)
//! - `CATALOG_STRIP_STAGE`: Strip `/{stage}` from HTTP API paths (default: `true`)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default service name when neither `SERVICE_NAME` nor the Lambda function
/// name is set.
pub const DEFAULT_SERVICE_NAME: &str = "catalog-lambda";

/// Default reserve before the platform deadline.
pub const DEFAULT_TIMEOUT_MARGIN: Duration = Duration::from_millis(250);

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging (default, CloudWatch).
    #[default]
    Json,
    /// Human-readable text logging (local runs).
    Text,
}

impl LogFormat {
    /// Accepts "json", "text", or "pretty" (alias for text). Anything else is
    /// `Json`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Settings for the invocation entrypoint and adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaConfig {
    pub service: String,
    pub timeout_margin: Duration,
    pub strip_stage: bool,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE_NAME.to_string(),
            timeout_margin: DEFAULT_TIMEOUT_MARGIN,
            strip_stage: true,
        }
    }
}

impl LambdaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let service = lookup("SERVICE_NAME")
            .or_else(|| lookup("AWS_LAMBDA_FUNCTION_NAME"))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.service);

        let timeout_margin = match lookup("CATALOG_TIMEOUT_MARGIN_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => {
                    warn!(
                        value = %raw,
                        error = %e,
                        "invalid CATALOG_TIMEOUT_MARGIN_MS, using default"
                    );
                    defaults.timeout_margin
                }
            },
            None => defaults.timeout_margin,
        };

        let strip_stage = match lookup("CATALOG_STRIP_STAGE") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "invalid CATALOG_STRIP_STAGE, using default");
                defaults.strip_stage
            }),
            None => defaults.strip_stage,
        };

        Self {
            service,
            timeout_margin,
            strip_stage,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_timeout_margin(mut self, margin: Duration) -> Self {
        self.timeout_margin = margin;
        self
    }
}

/// Parse common boolean spellings.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
