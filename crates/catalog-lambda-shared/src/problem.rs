//! RFC 9457 Problem Details for HTTP APIs.
//!
//! Every error that is recovered at the invocation boundary is rendered as a
//! problem document, so callers always receive an HTTP-shaped response.
//! See: <https://www.rfc-editor.org/rfc/rfc9457.html>

use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{AdaptError, DispatchError};
use crate::response::InternalResponse;

/// Problem type URI for malformed invocation events.
pub const PROBLEM_INVALID_REQUEST: &str = "/problems/invalid-request";

/// Problem type URI for paths no route matches.
pub const PROBLEM_NOT_FOUND: &str = "/problems/not-found";

/// Problem type URI for a known path called with the wrong method.
pub const PROBLEM_METHOD_NOT_ALLOWED: &str = "/problems/method-not-allowed";

/// Problem type URI for internal server errors.
pub const PROBLEM_INTERNAL_ERROR: &str = "/problems/internal-error";

/// Problem type URI for invocations cut short by the platform deadline.
pub const PROBLEM_TIMEOUT: &str = "/problems/timeout";

/// Detail returned for handler failures. The real cause is only logged.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal error occurred while handling the request";

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// RFC 9457 Problem Details response structure.
///
/// # Example
///
/// ```
/// use catalog_lambda_shared::{ProblemDetails, PROBLEM_NOT_FOUND};
/// use http::StatusCode;
///
/// let problem = ProblemDetails::new(PROBLEM_NOT_FOUND, "Not Found", StatusCode::NOT_FOUND)
///     .with_detail("Reference 'dev' does not exist")
///     .with_request_id("req-12345");
/// assert_eq!(problem.status, 404);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type (relative).
    #[serde(rename = "type")]
    pub type_uri: String,

    /// Short, human-readable summary of the problem.
    pub title: String,

    /// HTTP status code for this problem.
    pub status: u16,

    /// Human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Identifier of this occurrence (the invocation request id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    pub fn new(type_uri: impl Into<String>, title: impl Into<String>, status: StatusCode) -> Self {
        Self {
            type_uri: type_uri.into(),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
            instance: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        if !request_id.is_empty() {
            self.instance = Some(request_id);
        }
        self
    }

    /// 400 for an event the adapter could not translate.
    pub fn bad_request(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INVALID_REQUEST,
            "Invalid Request",
            StatusCode::BAD_REQUEST,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 404 for a path (or resource) that does not exist.
    pub fn not_found(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(PROBLEM_NOT_FOUND, "Not Found", StatusCode::NOT_FOUND)
            .with_detail(detail)
            .with_request_id(request_id)
    }

    pub fn method_not_allowed(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_METHOD_NOT_ALLOWED,
            "Method Not Allowed",
            StatusCode::METHOD_NOT_ALLOWED,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 500 with the fixed safe detail message.
    pub fn internal_error(request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INTERNAL_ERROR,
            "Internal Error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_detail(INTERNAL_ERROR_DETAIL)
        .with_request_id(request_id)
    }

    /// 504 when the invocation is about to exceed its deadline.
    pub fn timeout(request_id: impl Into<String>) -> Self {
        Self::new(PROBLEM_TIMEOUT, "Request Timeout", StatusCode::GATEWAY_TIMEOUT)
            .with_detail("The request could not be completed before the invocation deadline")
            .with_request_id(request_id)
    }

    /// Render as an `application/problem+json` response.
    pub fn into_response(self) -> InternalResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Serializing a struct of strings and an integer cannot fail.
        let body = serde_json::to_vec(&self).unwrap_or_default();
        InternalResponse::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_CONTENT_TYPE))
            .with_body(body)
    }
}

impl std::fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.title,
            self.detail.as_deref().unwrap_or("")
        )
    }
}

impl std::error::Error for ProblemDetails {}

/// Render an adapter failure as a 400 response.
pub fn from_adapt_error(err: &AdaptError, request_id: &str) -> InternalResponse {
    ProblemDetails::bad_request(err.to_string(), request_id).into_response()
}

/// Render a dispatch failure as a 404, 405 or 500 response.
///
/// Handler failures are logged here with their full cause; the response only
/// carries [`INTERNAL_ERROR_DETAIL`].
pub fn from_dispatch_error(err: &DispatchError, request_id: &str) -> InternalResponse {
    match err {
        DispatchError::NotFound { .. } => {
            ProblemDetails::not_found(err.to_string(), request_id).into_response()
        }
        DispatchError::MethodNotAllowed { allowed, .. } => {
            let mut response =
                ProblemDetails::method_not_allowed(err.to_string(), request_id).into_response();
            let allow = allowed
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers.insert(ALLOW, value);
            }
            response
        }
        DispatchError::HandlerFailed(cause) => {
            error!(request_id = %request_id, error = %format!("{cause:#}"), "route handler failed");
            ProblemDetails::internal_error(request_id).into_response()
        }
    }
}
