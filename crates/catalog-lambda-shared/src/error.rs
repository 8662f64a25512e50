//! Error taxonomy for the invocation pipeline.
//!
//! `AdaptError` and `DispatchError` never leave the entrypoint: they are
//! rendered into problem responses. `InitError` is the only error surfaced to
//! the Lambda runtime as an invocation failure.

use http::Method;
use thiserror::Error;

/// Failure translating a platform event into an [`InternalRequest`](crate::InternalRequest).
#[derive(Debug, Error)]
pub enum AdaptError {
    /// The envelope lacks a required field or carries undecodable content.
    #[error("malformed invocation event: {reason}")]
    MalformedEvent { reason: String },
}

impl AdaptError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            reason: reason.into(),
        }
    }
}

/// Failure resolving or executing a route.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered pattern matches the request path.
    #[error("no route matches {method} {path}")]
    NotFound { method: Method, path: String },

    /// At least one pattern matches the path, but none for this method.
    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// The handler returned an error or panicked.
    #[error("handler failed: {0:#}")]
    HandlerFailed(anyhow::Error),
}

/// Failure while building the application context on cold start.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("application context initialization failed: {0:#}")]
    ContextInitFailed(anyhow::Error),
}

impl InitError {
    /// Wrap any displayable cause.
    pub fn context(cause: impl std::fmt::Display) -> Self {
        Self::ContextInitFailed(anyhow::anyhow!("{cause}"))
    }
}

impl From<anyhow::Error> for InitError {
    fn from(err: anyhow::Error) -> Self {
        Self::ContextInitFailed(err)
    }
}

impl From<crate::dispatcher::PatternError> for InitError {
    fn from(err: crate::dispatcher::PatternError) -> Self {
        Self::ContextInitFailed(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_event_display_includes_reason() {
        let err = AdaptError::malformed("missing method");
        assert_eq!(
            err.to_string(),
            "malformed invocation event: missing method"
        );
    }

    #[test]
    fn handler_failed_display_includes_cause_chain() {
        let cause = anyhow::anyhow!("connection refused").context("loading reference");
        let err = DispatchError::HandlerFailed(cause);
        let text = err.to_string();
        assert!(text.contains("loading reference"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn init_error_from_display() {
        let err = InitError::context("bad config");
        assert!(err.to_string().contains("bad config"));
    }
}
