//! Response produced by route handlers.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

/// An HTTP response before it is wrapped in the platform envelope.
///
/// # Example
///
/// ```
/// use catalog_lambda_shared::InternalResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Config {
///     default_branch: String,
/// }
///
/// let response = InternalResponse::json(&Config { default_branch: "main".into() }).unwrap();
/// assert_eq!(response.status.as_u16(), 200);
/// ```
#[derive(Debug, Clone)]
pub struct InternalResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl InternalResponse {
    /// Empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// 200 response with a JSON body.
    pub fn json<T: Serialize + ?Sized>(data: &T) -> Result<Self, serde_json::Error> {
        Self::json_with_status(StatusCode::OK, data)
    }

    /// JSON body with an explicit status.
    pub fn json_with_status<T: Serialize + ?Sized>(
        status: StatusCode,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        Ok(Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    /// 200 response with a `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )
            .with_body(body.into().into_bytes())
    }

    /// Append a header value, keeping any values already present.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}
