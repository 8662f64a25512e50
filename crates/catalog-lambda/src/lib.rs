//! AWS Lambda function serving the catalog HTTP API.
//!
//! The function answers API Gateway proxy events. All routing and lifecycle
//! handling lives in `catalog-lambda-shared`; this crate supplies the
//! application context factory and the handlers it registers.

mod config;
mod handlers;
mod models;

use std::sync::Arc;

use http::Method;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

use catalog_lambda_shared::{
    init_tracing, ApiGatewayAdapter, ApplicationContext, ColdStartCache, Dispatcher, InitError,
    InvocationEntrypoint, LambdaConfig, LoggingConfig,
};

pub use config::{validate_reference_name, CatalogConfig, DEFAULT_BRANCH};
pub use handlers::{MAX_API_VERSION, MIN_API_VERSION, SPEC_VERSION};
pub use models::{ConfigV1Dto, ConfigV2Dto, HealthDto, ReferenceDto, ReferenceType, ReferencesDto};

/// Application context for this execution environment.
static CONTEXT: ColdStartCache<ApplicationContext> = ColdStartCache::new();

/// Build the routing table and wrap it in an [`ApplicationContext`].
///
/// This is the context factory: it runs once per execution environment, on
/// the first invocation.
pub fn build_context(
    service: &str,
    catalog: CatalogConfig,
) -> Result<ApplicationContext, InitError> {
    let catalog = Arc::new(catalog);
    let mut dispatcher = Dispatcher::new();

    dispatcher
        .route(
            Method::GET,
            "/api/v1/config",
            handlers::config_v1(Arc::clone(&catalog)),
        )?
        .route(
            Method::GET,
            "/api/v2/config",
            handlers::config_v2(Arc::clone(&catalog)),
        )?
        .route(
            Method::GET,
            "/api/v2/trees",
            handlers::list_references(Arc::clone(&catalog)),
        )?
        .route(
            Method::GET,
            "/api/v2/trees/{*ref}",
            handlers::get_reference(Arc::clone(&catalog)),
        )?
        .route(
            Method::GET,
            "/health/live",
            handlers::health(service.to_string()),
        )?
        .route(
            Method::GET,
            "/health/ready",
            handlers::health(service.to_string()),
        )?;

    info!(
        service = %service,
        routes = dispatcher.len(),
        default_branch = %catalog.default_branch,
        references = catalog.references.len(),
        "catalog routes registered"
    );

    Ok(ApplicationContext::new(service, dispatcher))
}

/// Context factory reading catalog settings from the environment.
pub fn context_from_env(service: &str) -> Result<ApplicationContext, InitError> {
    let catalog = CatalogConfig::from_env()?;
    build_context(service, catalog)
}

/// Entrypoint wired to the process-wide context cache.
pub fn entrypoint(
    config: &LambdaConfig,
) -> InvocationEntrypoint<
    ApiGatewayAdapter,
    impl Fn() -> Result<ApplicationContext, InitError> + Send + Sync,
> {
    let adapter = ApiGatewayAdapter::new().with_stage_stripping(config.strip_stage);
    let service = config.service.clone();

    InvocationEntrypoint::new(&CONTEXT, adapter, move || context_from_env(&service))
        .with_timeout_margin(config.timeout_margin)
}

/// Entry point used by the Lambda runtime.
pub async fn run() -> Result<(), Error> {
    init_tracing(&LoggingConfig::from_env());

    let config = LambdaConfig::from_env();
    info!(
        service = %config.service,
        timeout_margin_ms = config.timeout_margin.as_millis() as u64,
        strip_stage = config.strip_stage,
        "starting catalog function"
    );

    let entrypoint = Arc::new(entrypoint(&config));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let entrypoint = Arc::clone(&entrypoint);
        async move { entrypoint.invoke(event).await }
    }))
    .await
}
