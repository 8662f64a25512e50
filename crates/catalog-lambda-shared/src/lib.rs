//! Shared infrastructure for catalog AWS Lambda functions.
//!
//! This crate provides the request dispatch and cold-start lifecycle layer
//! that fronts the catalog service when it is deployed as a function:
//!
//! - [`ColdStartCache`]: Process-wide, retry-on-failure initialization guard
//! - [`RequestAdapter`]: API Gateway envelope <-> [`InternalRequest`] / [`InternalResponse`]
//! - [`Dispatcher`]: Method and path pattern routing with panic isolation
//! - [`InvocationEntrypoint`]: Per-event entrypoint owning the Cold/Warm/Handling lifecycle
//! - [`ProblemDetails`]: RFC 9457 Problem Details for consistent error responses
//! - [`init_tracing`]: JSON-formatted tracing for CloudWatch Logs
//!
//! # Flow
//!
//! ```text
//! event --> InvocationEntrypoint --get_or_init--> ColdStartCache --> ApplicationContext
//!                  |
//!                  +--> RequestAdapter::to_internal --> Dispatcher::dispatch --> handler
//!                  |
//!                  +<-- RequestAdapter::to_envelope <-- InternalResponse / ProblemDetails
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides event builders and mock contexts for
//! handler testing. Enable the `test-utils` feature to access it from
//! dependent crates.

#![deny(warnings)]

mod adapter;
mod cold_start;
pub mod config;
mod context;
mod dispatcher;
mod entrypoint;
mod error;
mod problem;
mod request;
mod response;
mod tracing_init;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapter::{
    ApiGatewayAdapter, EventHttp, EventIdentity, EventRequestContext, InvocationEvent,
    RequestAdapter, ResponseEnvelope,
};
pub use cold_start::ColdStartCache;
pub use config::{LambdaConfig, LogFormat, LoggingConfig};
pub use context::ApplicationContext;
pub use dispatcher::{
    Dispatcher, Handler, HandlerResult, PathParams, PathPattern, PatternError, RouteEntry,
};
pub use entrypoint::{InvocationEntrypoint, Phase};
pub use error::{AdaptError, DispatchError, InitError};
pub use problem::{
    from_adapt_error, from_dispatch_error, ProblemDetails, INTERNAL_ERROR_DETAIL,
    PROBLEM_INTERNAL_ERROR, PROBLEM_INVALID_REQUEST, PROBLEM_METHOD_NOT_ALLOWED,
    PROBLEM_NOT_FOUND, PROBLEM_TIMEOUT,
};
pub use request::InternalRequest;
pub use response::InternalResponse;
pub use tracing_init::init_tracing;
