//! Method and path based routing, independent of the hosting environment.
//!
//! Routes are registered while the [`ApplicationContext`](crate::ApplicationContext)
//! is built and are immutable afterwards, so `dispatch` takes `&self` and
//! needs no locking.
//!
//! # Pattern syntax
//!
//! ```text
//! /api/v2/trees               static segments only
//! /api/v2/trees/{ref}         `{name}` matches exactly one segment
//! /api/v2/contents/{*key}     `{*name}` matches all remaining segments (last only)
//! ```
//!
//! # Match order
//!
//! Among patterns matching the path, the most specific wins: more leading
//! static segments first, then more static segments overall, then patterns
//! without a tail wildcard. Remaining ties go to the earliest registration.

use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::Method;
use thiserror::Error;
use tracing::debug;

use crate::error::DispatchError;
use crate::request::InternalRequest;
use crate::response::InternalResponse;

/// Result type returned by route handlers.
pub type HandlerResult = anyhow::Result<InternalResponse>;

/// A route handler.
///
/// Implemented for every `Fn(&InternalRequest, &PathParams) -> HandlerResult`
/// closure that is `Send + Sync`, which is how most routes are registered.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &InternalRequest, params: &PathParams) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&InternalRequest, &PathParams) -> HandlerResult + Send + Sync,
{
    fn handle(&self, request: &InternalRequest, params: &PathParams) -> HandlerResult {
        self(request, params)
    }
}

/// Invalid route pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("route pattern must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("route pattern has an unbalanced brace in segment '{segment}'")]
    UnbalancedBrace { segment: String },

    #[error("route pattern has an empty parameter name in '{pattern}'")]
    EmptyParameter { pattern: String },

    #[error("route parameter '{name}' appears more than once in '{pattern}'")]
    DuplicateParameter { name: String, pattern: String },

    #[error("wildcard '{{*{name}}}' must be the last segment of '{pattern}'")]
    WildcardNotLast { name: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Ordering key; larger is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Specificity {
    static_prefix: usize,
    static_total: usize,
    no_wildcard: bool,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(pattern.to_string()));
        }

        let raw_segments: Vec<&str> = split_path(pattern).collect();
        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut seen = HashSet::new();

        for (index, raw) in raw_segments.iter().enumerate() {
            let opens = raw.matches('{').count();
            let closes = raw.matches('}').count();

            if opens == 0 && closes == 0 {
                segments.push(Segment::Static((*raw).to_string()));
                continue;
            }

            if opens != 1 || closes != 1 || !raw.starts_with('{') || !raw.ends_with('}') {
                return Err(PatternError::UnbalancedBrace {
                    segment: (*raw).to_string(),
                });
            }

            let inner = &raw[1..raw.len() - 1];
            let (wildcard, name) = match inner.strip_prefix('*') {
                Some(name) => (true, name),
                None => (false, inner),
            };

            if name.is_empty() {
                return Err(PatternError::EmptyParameter {
                    pattern: pattern.to_string(),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(PatternError::DuplicateParameter {
                    name: name.to_string(),
                    pattern: pattern.to_string(),
                });
            }
            if wildcard && index + 1 != raw_segments.len() {
                return Err(PatternError::WildcardNotLast {
                    name: name.to_string(),
                    pattern: pattern.to_string(),
                });
            }

            segments.push(if wildcard {
                Segment::Wildcard(name.to_string())
            } else {
                Segment::Param(name.to_string())
            });
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn specificity(&self) -> Specificity {
        let static_prefix = self
            .segments
            .iter()
            .take_while(|s| matches!(s, Segment::Static(_)))
            .count();
        let static_total = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count();
        let no_wildcard = !matches!(self.segments.last(), Some(Segment::Wildcard(_)));
        Specificity {
            static_prefix,
            static_total,
            no_wildcard,
        }
    }

    /// Match a request path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = PathParams::default();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if parts.get(index) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(index)?;
                    params.push(name, value);
                }
                Segment::Wildcard(name) => {
                    if index >= parts.len() {
                        return None;
                    }
                    params.push(name, &parts[index..].join("/"));
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Path parameters captured by a matched pattern, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    fn push(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A `(method, pattern, handler)` registration.
#[derive(Clone)]
pub struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl RouteEntry {
    pub fn new(
        method: Method,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            method,
            pattern: PathPattern::parse(pattern)?,
            handler: Arc::new(handler),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.raw)
            .finish_non_exhaustive()
    }
}

/// The routing table.
#[derive(Debug, Default, Clone)]
pub struct Dispatcher {
    routes: Vec<RouteEntry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: RouteEntry) {
        debug!(method = %entry.method, pattern = %entry.pattern, "registering route");
        self.routes.push(entry);
    }

    /// Parse `pattern` and register `handler` for `method`.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<&mut Self, PatternError> {
        self.register(RouteEntry::new(method, pattern, handler)?);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Resolve the route for `request` and run its handler.
    ///
    /// Handler errors and panics are both reported as
    /// [`DispatchError::HandlerFailed`].
    pub fn dispatch(&self, request: &InternalRequest) -> Result<InternalResponse, DispatchError> {
        let (entry, params) = self.resolve(&request.method, &request.path)?;

        debug!(
            method = %request.method,
            path = %request.path,
            pattern = %entry.pattern,
            "dispatching request"
        );

        match catch_unwind(AssertUnwindSafe(|| entry.handler.handle(request, &params))) {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(DispatchError::HandlerFailed(err)),
            Err(payload) => Err(DispatchError::HandlerFailed(anyhow::anyhow!(
                "handler for {} {} panicked: {}",
                entry.method,
                entry.pattern,
                panic_message(payload.as_ref())
            ))),
        }
    }

    fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(&RouteEntry, PathParams), DispatchError> {
        let mut best: Option<(Specificity, &RouteEntry, PathParams)> = None;
        let mut allowed: Vec<Method> = Vec::new();

        for entry in &self.routes {
            let Some(params) = entry.pattern.matches(path) else {
                continue;
            };

            if entry.method != *method {
                if !allowed.contains(&entry.method) {
                    allowed.push(entry.method.clone());
                }
                continue;
            }

            let specificity = entry.pattern.specificity();
            // Strictly greater keeps the earliest registration on ties.
            if best.as_ref().map_or(true, |(s, _, _)| specificity > *s) {
                best = Some((specificity, entry, params));
            }
        }

        match best {
            Some((_, entry, params)) => Ok((entry, params)),
            None if !allowed.is_empty() => Err(DispatchError::MethodNotAllowed {
                method: method.clone(),
                path: path.to_string(),
                allowed,
            }),
            None => Err(DispatchError::NotFound {
                method: method.clone(),
                path: path.to_string(),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn tagged(tag: &'static str) -> impl Handler {
        move |_: &InternalRequest, params: &PathParams| -> HandlerResult {
            let mut body = tag.to_string();
            for (k, v) in params.iter() {
                body.push_str(&format!(" {k}={v}"));
            }
            Ok(InternalResponse::text(body))
        }
    }

    fn body(response: &InternalResponse) -> &str {
        std::str::from_utf8(&response.body).unwrap()
    }

    fn get(path: &str) -> InternalRequest {
        InternalRequest::new(Method::GET, path)
    }

    #[test]
    fn parse_rejects_invalid_patterns() {
        assert!(matches!(
            PathPattern::parse("trees"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            PathPattern::parse("/trees/{ref"),
            Err(PatternError::UnbalancedBrace { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/trees/x{ref}"),
            Err(PatternError::UnbalancedBrace { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/trees/{}"),
            Err(PatternError::EmptyParameter { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/trees/{a}/{a}"),
            Err(PatternError::DuplicateParameter { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/contents/{*key}/tail"),
            Err(PatternError::WildcardNotLast { .. })
        ));
    }

    #[test]
    fn pattern_matches_params_and_wildcards() {
        let pattern = PathPattern::parse("/trees/{ref}/contents/{*key}").unwrap();
        let params = pattern.matches("/trees/main/contents/db/table").unwrap();
        assert_eq!(params.get("ref"), Some("main"));
        assert_eq!(params.get("key"), Some("db/table"));

        assert!(pattern.matches("/trees/main/contents").is_none());
        assert!(pattern.matches("/trees/main/other/x").is_none());
    }

    #[test]
    fn trailing_and_repeated_slashes_are_ignored() {
        let pattern = PathPattern::parse("/trees").unwrap();
        assert!(pattern.matches("/trees/").is_some());
        assert!(pattern.matches("//trees").is_some());
        assert!(pattern.matches("/trees/x").is_none());
    }

    #[test]
    fn root_pattern_matches_root_only() {
        let pattern = PathPattern::parse("/").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/trees").is_none());
    }

    #[test]
    fn dispatches_exact_route() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(Method::GET, "/trees", tagged("handler-a"))
            .unwrap();

        let response = dispatcher.dispatch(&get("/trees")).unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body(&response), "handler-a");
    }

    #[test]
    fn static_prefix_beats_parameter() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(Method::GET, "/trees/{ref}", tagged("param"))
            .unwrap()
            .route(Method::GET, "/trees/main", tagged("static"))
            .unwrap();

        assert_eq!(body(&dispatcher.dispatch(&get("/trees/main")).unwrap()), "static");
        assert_eq!(
            body(&dispatcher.dispatch(&get("/trees/dev")).unwrap()),
            "param ref=dev"
        );
    }

    #[test]
    fn parameter_beats_wildcard_at_equal_prefix() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(Method::GET, "/trees/{*rest}", tagged("wildcard"))
            .unwrap()
            .route(Method::GET, "/trees/{ref}", tagged("param"))
            .unwrap();

        assert_eq!(
            body(&dispatcher.dispatch(&get("/trees/dev")).unwrap()),
            "param ref=dev"
        );
        assert_eq!(
            body(&dispatcher.dispatch(&get("/trees/dev/log")).unwrap()),
            "wildcard rest=dev/log"
        );
    }

    #[test]
    fn equal_specificity_uses_registration_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(Method::GET, "/trees/{a}", tagged("first"))
            .unwrap()
            .route(Method::GET, "/trees/{b}", tagged("second"))
            .unwrap();

        assert_eq!(
            body(&dispatcher.dispatch(&get("/trees/x")).unwrap()),
            "first a=x"
        );
    }

    #[test]
    fn unknown_path_is_not_found() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.route(Method::GET, "/trees", tagged("a")).unwrap();

        let err = dispatcher
            .dispatch(&InternalRequest::new(Method::POST, "/unknown"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { .. }));
    }

    #[test]
    fn empty_dispatcher_is_not_found() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.is_empty());
        assert!(matches!(
            dispatcher.dispatch(&get("/")).unwrap_err(),
            DispatchError::NotFound { .. }
        ));
    }

    #[test]
    fn wrong_method_is_method_not_allowed() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(Method::GET, "/trees", tagged("get"))
            .unwrap()
            .route(Method::POST, "/trees", tagged("post"))
            .unwrap()
            .route(Method::GET, "/trees/{ref}", tagged("param"))
            .unwrap();

        let err = dispatcher
            .dispatch(&InternalRequest::new(Method::DELETE, "/trees"))
            .unwrap_err();
        match err {
            DispatchError::MethodNotAllowed { allowed, .. } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn method_match_is_exact() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.route(Method::GET, "/trees", tagged("get")).unwrap();

        let err = dispatcher
            .dispatch(&InternalRequest::new(Method::HEAD, "/trees"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotAllowed { .. }));
    }

    #[test]
    fn handler_error_is_captured() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(
                Method::GET,
                "/fail",
                |_: &InternalRequest, _: &PathParams| -> HandlerResult {
                    Err(anyhow::anyhow!("backend unavailable"))
                },
            )
            .unwrap();

        let err = dispatcher.dispatch(&get("/fail")).unwrap_err();
        match err {
            DispatchError::HandlerFailed(cause) => {
                assert!(cause.to_string().contains("backend unavailable"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn handler_panic_is_captured() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .route(
                Method::GET,
                "/panic",
                |_: &InternalRequest, _: &PathParams| -> HandlerResult {
                    panic!("boom")
                },
            )
            .unwrap();

        let err = dispatcher.dispatch(&get("/panic")).unwrap_err();
        match err {
            DispatchError::HandlerFailed(cause) => assert!(cause.to_string().contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
