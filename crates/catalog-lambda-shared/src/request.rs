//! Platform-independent request representation.

use std::collections::BTreeMap;

use http::{HeaderMap, Method};

/// A normalized HTTP request, independent of the envelope it arrived in.
///
/// Header names are lowercase and each name carries a single value; repeated
/// headers have already been comma-joined by the adapter.
#[derive(Debug, Clone)]
pub struct InternalRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
    /// Platform request id from the envelope, empty if the envelope had none.
    pub request_id: String,
    /// Caller address reported by the platform, if any.
    pub source_ip: Option<String>,
}

impl InternalRequest {
    /// Create a request with no headers, query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: BTreeMap::new(),
            body: Vec::new(),
            request_id: String::new(),
            source_ip: None,
        }
    }

    /// Value of a header as UTF-8, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a query parameter, in the order received.
    pub fn query_values(&self, name: &str) -> &[String] {
        self.query.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Body as UTF-8 text.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut request = InternalRequest::new(Method::GET, "/trees");
        request
            .headers
            .insert("accept", HeaderValue::from_static("application/json"));
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn query_helpers_return_values_in_order() {
        let mut request = InternalRequest::new(Method::GET, "/trees");
        request.query.insert(
            "ref".to_string(),
            vec!["main".to_string(), "dev".to_string()],
        );
        assert_eq!(request.query_param("ref"), Some("main"));
        assert_eq!(request.query_values("ref"), ["main", "dev"]);
        assert!(request.query_values("other").is_empty());
    }
}
