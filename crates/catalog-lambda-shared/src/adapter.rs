//! Translation between API Gateway proxy envelopes and internal requests.
//!
//! Both payload formats are accepted:
//!
//! - REST API / format 1.0: `httpMethod`, `path`, `multiValueHeaders`,
//!   `multiValueQueryStringParameters`, `requestContext.identity`.
//! - HTTP API / format 2.0: `version: "2.0"`, `rawPath`,
//!   `requestContext.http`, `cookies`.
//!
//! Everything platform-specific stays in this module; the dispatcher and the
//! handlers only see [`InternalRequest`] and [`InternalResponse`].

use std::collections::{BTreeMap, BTreeSet};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdaptError;
use crate::request::InternalRequest;
use crate::response::InternalResponse;

/// Converts a platform event into an [`InternalRequest`] and a handler
/// response back into the platform's envelope.
pub trait RequestAdapter: Send + Sync {
    type Event: DeserializeOwned;
    type Envelope: Serialize;

    /// Decode the raw invocation payload.
    fn parse_event(&self, payload: Value) -> Result<Self::Event, AdaptError> {
        serde_json::from_value(payload)
            .map_err(|e| AdaptError::malformed(format!("invalid event payload: {e}")))
    }

    fn to_internal(&self, event: Self::Event) -> Result<InternalRequest, AdaptError>;

    fn to_envelope(&self, response: InternalResponse) -> Self::Envelope;
}

/// API Gateway proxy event, covering payload formats 1.0 and 2.0.
///
/// Immutable once received; the adapter consumes it. Header maps keep the
/// order the names appear in the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<IndexMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value_query_string_parameters: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_context: Option<EventRequestContext>,
}

impl InvocationEvent {
    fn is_v2(&self) -> bool {
        self.version.as_deref() == Some("2.0")
    }
}

/// The subset of `requestContext` the adapter reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<EventHttp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<EventIdentity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHttp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
}

/// Proxy integration response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// `Set-Cookie` values, which cannot be comma-joined.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

/// [`RequestAdapter`] for API Gateway REST and HTTP APIs.
#[derive(Debug, Clone)]
pub struct ApiGatewayAdapter {
    strip_stage: bool,
}

impl Default for ApiGatewayAdapter {
    fn default() -> Self {
        Self { strip_stage: true }
    }
}

impl ApiGatewayAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to remove a leading `/{stage}` from HTTP API `rawPath` values
    /// for non-`$default` stages.
    pub fn with_stage_stripping(mut self, strip_stage: bool) -> Self {
        self.strip_stage = strip_stage;
        self
    }

    fn method(event: &InvocationEvent) -> Result<Method, AdaptError> {
        let context = event.request_context.as_ref();
        let raw = context
            .and_then(|c| c.http.as_ref())
            .and_then(|h| h.method.as_deref())
            .or(event.http_method.as_deref())
            .or(context.and_then(|c| c.http_method.as_deref()))
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AdaptError::malformed("missing HTTP method"))?;

        Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map_err(|_| AdaptError::malformed(format!("invalid HTTP method '{raw}'")))
    }

    fn path(&self, event: &InvocationEvent) -> Result<String, AdaptError> {
        let context = event.request_context.as_ref();
        let raw = event
            .raw_path
            .as_deref()
            .or(event.path.as_deref())
            .or(context
                .and_then(|c| c.http.as_ref())
                .and_then(|h| h.path.as_deref()))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AdaptError::malformed("missing request path"))?;

        if !raw.starts_with('/') {
            return Err(AdaptError::malformed(format!(
                "request path must start with '/': {raw}"
            )));
        }

        let stage = context.and_then(|c| c.stage.as_deref());
        let path = match stage {
            Some(stage) if self.strip_stage && event.is_v2() && event.raw_path.is_some() => {
                strip_stage_prefix(raw, stage)
            }
            _ => raw,
        };

        // Format 2.0 paths arrive percent-encoded, 1.0 paths already decoded.
        if !event.is_v2() {
            return Ok(path.to_string());
        }
        percent_decode_str(path)
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .map_err(|_| AdaptError::malformed(format!("request path is not valid UTF-8: {raw}")))
    }

    fn headers(event: &InvocationEvent) -> Result<HeaderMap, AdaptError> {
        let mut merged: IndexMap<String, Vec<String>> = IndexMap::new();

        if let Some(multi) = &event.multi_value_headers {
            for (name, values) in multi {
                merged
                    .entry(name.to_ascii_lowercase())
                    .or_default()
                    .extend(values.iter().cloned());
            }
        }

        // Format 1.0 mirrors the last value of every multi-value header into
        // `headers`; only names absent from `multiValueHeaders` are new.
        let from_multi: BTreeSet<String> = merged.keys().cloned().collect();
        if let Some(single) = &event.headers {
            for (name, value) in single {
                let lower = name.to_ascii_lowercase();
                if !from_multi.contains(&lower) {
                    merged.entry(lower).or_default().push(value.clone());
                }
            }
        }

        if let Some(cookies) = event.cookies.as_ref().filter(|c| !c.is_empty()) {
            merged
                .entry(COOKIE.as_str().to_string())
                .or_default()
                .extend(cookies.iter().cloned());
        }

        let mut headers = HeaderMap::with_capacity(merged.len());
        for (name, values) in merged {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AdaptError::malformed(format!("invalid header name '{name}'")))?;
            let separator = if header_name == COOKIE { "; " } else { ", " };
            let value = HeaderValue::from_str(&values.join(separator)).map_err(|_| {
                AdaptError::malformed(format!("invalid value for header '{name}'"))
            })?;
            headers.insert(header_name, value);
        }

        Ok(headers)
    }

    fn query(event: &InvocationEvent) -> BTreeMap<String, Vec<String>> {
        if let Some(multi) = &event.multi_value_query_string_parameters {
            return multi.clone();
        }

        event
            .query_string_parameters
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect()
    }

    fn body(event: &InvocationEvent) -> Result<Vec<u8>, AdaptError> {
        match event.body.as_deref() {
            None => Ok(Vec::new()),
            Some(body) if event.is_base64_encoded => BASE64
                .decode(body)
                .map_err(|e| AdaptError::malformed(format!("invalid base64 body: {e}"))),
            Some(body) => Ok(body.as_bytes().to_vec()),
        }
    }
}

impl RequestAdapter for ApiGatewayAdapter {
    type Event = InvocationEvent;
    type Envelope = ResponseEnvelope;

    fn to_internal(&self, event: InvocationEvent) -> Result<InternalRequest, AdaptError> {
        let method = Self::method(&event)?;
        let path = self.path(&event)?;
        let headers = Self::headers(&event)?;
        let query = Self::query(&event);
        let body = Self::body(&event)?;

        let context = event.request_context.as_ref();
        let request_id = context
            .and_then(|c| c.request_id.clone())
            .unwrap_or_default();
        let source_ip = context.and_then(|c| {
            c.http
                .as_ref()
                .and_then(|h| h.source_ip.clone())
                .or_else(|| c.identity.as_ref().and_then(|i| i.source_ip.clone()))
        });

        Ok(InternalRequest {
            method,
            path,
            headers,
            query,
            body,
            request_id,
            source_ip,
        })
    }

    fn to_envelope(&self, response: InternalResponse) -> ResponseEnvelope {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        let mut cookies = Vec::new();

        for name in response.headers.keys() {
            let values: Vec<String> = response
                .headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();

            if *name == SET_COOKIE {
                cookies.extend(values);
            } else {
                headers.insert(name.as_str().to_string(), values.join(", "));
            }
        }

        let textual = response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_textual_content_type);

        let (body, is_base64_encoded) = if response.body.is_empty() {
            (String::new(), false)
        } else if textual {
            match String::from_utf8(response.body) {
                Ok(text) => (text, false),
                Err(err) => (BASE64.encode(err.as_bytes()), true),
            }
        } else {
            (BASE64.encode(&response.body), true)
        };

        ResponseEnvelope {
            status_code: response.status.as_u16(),
            headers,
            cookies,
            body,
            is_base64_encoded,
        }
    }
}

/// Remove `/{stage}` from the front of `path` unless the stage is `$default`.
fn strip_stage_prefix<'a>(path: &'a str, stage: &str) -> &'a str {
    if stage.is_empty() || stage == "$default" {
        return path;
    }

    match path
        .strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(stage))
    {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Content types sent as plain text rather than base64.
fn is_textual_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || matches!(
            essence.as_str(),
            "application/json"
                | "application/xml"
                | "application/javascript"
                | "application/x-www-form-urlencoded"
        )
}
