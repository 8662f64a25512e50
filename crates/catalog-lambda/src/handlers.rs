//! Route handlers for the catalog function.
//!
//! Each constructor captures the shared state it needs and returns a closure
//! suitable for [`Dispatcher::route`](catalog_lambda_shared::Dispatcher::route).

use std::sync::Arc;

use catalog_lambda_shared::{
    Handler, HandlerResult, InternalRequest, InternalResponse, PathParams, ProblemDetails,
};
use tracing::debug;

use crate::config::CatalogConfig;
use crate::models::{ConfigV1Dto, ConfigV2Dto, HealthDto, ReferenceDto, ReferencesDto};

/// Highest REST API version this function serves.
pub const MAX_API_VERSION: u32 = 2;
/// Lowest REST API version this function serves.
pub const MIN_API_VERSION: u32 = 1;
/// Version of the v2 API specification implemented.
pub const SPEC_VERSION: &str = "2.1.0";

/// `GET /api/v1/config`
pub fn config_v1(config: Arc<CatalogConfig>) -> impl Handler {
    move |_: &InternalRequest, _: &PathParams| -> HandlerResult {
        Ok(InternalResponse::json(&ConfigV1Dto {
            default_branch: config.default_branch.clone(),
            max_supported_api_version: MAX_API_VERSION,
        })?)
    }
}

/// `GET /api/v2/config`
pub fn config_v2(config: Arc<CatalogConfig>) -> impl Handler {
    move |_: &InternalRequest, _: &PathParams| -> HandlerResult {
        Ok(InternalResponse::json(&ConfigV2Dto {
            default_branch: config.default_branch.clone(),
            min_supported_api_version: MIN_API_VERSION,
            max_supported_api_version: MAX_API_VERSION,
            actual_api_version: MAX_API_VERSION,
            spec_version: SPEC_VERSION.to_string(),
        })?)
    }
}

/// `GET /api/v2/trees`
pub fn list_references(config: Arc<CatalogConfig>) -> impl Handler {
    move |_: &InternalRequest, _: &PathParams| -> HandlerResult {
        let references = config
            .references
            .iter()
            .map(ReferenceDto::branch)
            .collect();
        Ok(InternalResponse::json(&ReferencesDto { references })?)
    }
}

/// `GET /api/v2/trees/{*ref}`
///
/// An unknown reference is an ordinary 404 problem, not a handler failure.
pub fn get_reference(config: Arc<CatalogConfig>) -> impl Handler {
    move |request: &InternalRequest, params: &PathParams| -> HandlerResult {
        let name = params
            .get("ref")
            .ok_or_else(|| anyhow::anyhow!("route is missing the 'ref' parameter"))?;

        match config.reference(name) {
            Some(found) => Ok(InternalResponse::json(&ReferenceDto::branch(found))?),
            None => {
                debug!(reference = %name, "reference not found");
                Ok(ProblemDetails::not_found(
                    format!("Named reference '{name}' not found"),
                    request.request_id.as_str(),
                )
                .into_response())
            }
        }
    }
}

/// `GET /health/live` and `GET /health/ready`
///
/// Readiness equals liveness here: the handler can only run once the
/// application context exists.
pub fn health(service: String) -> impl Handler {
    move |_: &InternalRequest, _: &PathParams| -> HandlerResult {
        Ok(InternalResponse::json(&HealthDto {
            status: "ok".to_string(),
            service: service.clone(),
        })?)
    }
}
