//! Test utilities for Lambda handler testing.
//!
//! Builders for API Gateway payloads and Lambda contexts, shared by the unit
//! tests in this crate and by dependent crates through the `test-utils`
//! feature.
//!
//! ```ignore
//! use catalog_lambda_shared::test_utils::{api_gateway_v2_event, lambda_context};
//! use lambda_runtime::LambdaEvent;
//!
//! let event = LambdaEvent::new(
//!     api_gateway_v2_event("GET", "/api/v2/config"),
//!     lambda_context("config"),
//! );
//! ```

use lambda_runtime::Context;
use serde_json::{json, Value};

/// Create a mock request ID for testing.
///
/// Returns a request ID string in the format "test-request-{suffix}".
pub fn mock_request_id(suffix: &str) -> String {
    format!("test-request-{}", suffix)
}

/// A Lambda context with a mock request id and no deadline.
///
/// `Context` is non-exhaustive, so start from the default and set fields.
pub fn lambda_context(suffix: &str) -> Context {
    let mut context = Context::default();
    context.request_id = mock_request_id(suffix);
    context
}

/// Minimal HTTP API (payload format 2.0) event.
pub fn api_gateway_v2_event(method: &str, path: &str) -> Value {
    json!({
        "version": "2.0",
        "routeKey": "$default",
        "rawPath": path,
        "rawQueryString": "",
        "headers": {},
        "requestContext": {
            "requestId": "apigw-v2-request",
            "stage": "$default",
            "http": {
                "method": method,
                "path": path,
                "protocol": "HTTP/1.1",
                "sourceIp": "203.0.113.10",
                "userAgent": "test-agent"
            }
        },
        "isBase64Encoded": false
    })
}

/// Minimal REST API (payload format 1.0) event.
pub fn api_gateway_v1_event(method: &str, path: &str) -> Value {
    json!({
        "resource": "/{proxy+}",
        "path": path,
        "httpMethod": method,
        "headers": null,
        "multiValueHeaders": null,
        "queryStringParameters": null,
        "multiValueQueryStringParameters": null,
        "requestContext": {
            "requestId": "apigw-v1-request",
            "stage": "prod",
            "httpMethod": method,
            "identity": {"sourceIp": "203.0.113.11"}
        },
        "body": null,
        "isBase64Encoded": false
    })
}

/// Set a JSON body on an event built by one of the helpers above.
pub fn with_json_body(mut event: Value, body: &Value) -> Value {
    event["body"] = Value::String(body.to_string());
    event["isBase64Encoded"] = Value::Bool(false);
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_request_id_formats_correctly() {
        let id = mock_request_id("123");
        assert_eq!(id, "test-request-123");
    }

    #[test]
    fn lambda_context_has_no_deadline() {
        let context = lambda_context("ctx");
        assert_eq!(context.request_id, "test-request-ctx");
        assert_eq!(context.deadline, 0);
    }

    #[test]
    fn events_carry_method_and_path() {
        let v2 = api_gateway_v2_event("GET", "/trees");
        assert_eq!(v2["requestContext"]["http"]["method"], "GET");
        assert_eq!(v2["rawPath"], "/trees");

        let v1 = with_json_body(api_gateway_v1_event("POST", "/trees"), &json!({"a": 1}));
        assert_eq!(v1["httpMethod"], "POST");
        assert_eq!(v1["body"], r#"{"a":1}"#);
    }
}
