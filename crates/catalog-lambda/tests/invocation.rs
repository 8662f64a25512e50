use catalog_lambda::{build_context, CatalogConfig, ConfigV2Dto, ReferenceDto, ReferencesDto};
use catalog_lambda_shared::test_utils::{
    api_gateway_v1_event, api_gateway_v2_event, lambda_context, with_json_body,
};
use catalog_lambda_shared::{
    ApiGatewayAdapter, ApplicationContext, ColdStartCache, InitError, InvocationEntrypoint, Phase,
    ProblemDetails, ResponseEnvelope,
};
use lambda_runtime::LambdaEvent;
use serde_json::{json, Value};

fn catalog() -> CatalogConfig {
    CatalogConfig {
        default_branch: "main".to_string(),
        references: vec!["main".to_string(), "release/1.0".to_string()],
    }
}

fn entrypoint() -> InvocationEntrypoint<
    ApiGatewayAdapter,
    impl Fn() -> Result<ApplicationContext, InitError> + Send + Sync,
> {
    let cache: &'static ColdStartCache<ApplicationContext> =
        Box::leak(Box::new(ColdStartCache::new()));
    InvocationEntrypoint::new(cache, ApiGatewayAdapter::new(), || {
        build_context("catalog-test", catalog())
    })
}

async fn invoke(payload: Value) -> ResponseEnvelope {
    entrypoint()
        .invoke(LambdaEvent::new(payload, lambda_context("invocation")))
        .await
        .expect("invocation should produce an envelope")
}

fn problem(envelope: &ResponseEnvelope) -> ProblemDetails {
    serde_json::from_str(&envelope.body).expect("problem body")
}

#[tokio::test]
async fn returns_v2_config() {
    let envelope = invoke(api_gateway_v2_event("GET", "/api/v2/config")).await;

    assert_eq!(envelope.status_code, 200);
    assert!(!envelope.is_base64_encoded);
    assert_eq!(
        envelope.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    let config: ConfigV2Dto = serde_json::from_str(&envelope.body).unwrap();
    assert_eq!(config.default_branch, "main");
    assert_eq!(config.max_supported_api_version, 2);
}

#[tokio::test]
async fn lists_references_from_v1_event() {
    let envelope = invoke(api_gateway_v1_event("GET", "/api/v2/trees")).await;

    assert_eq!(envelope.status_code, 200);
    let refs: ReferencesDto = serde_json::from_str(&envelope.body).unwrap();
    let names: Vec<&str> = refs.references.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["main", "release/1.0"]);
}

#[tokio::test]
async fn reference_lookup_accepts_slashes() {
    let envelope = invoke(api_gateway_v2_event("GET", "/api/v2/trees/release/1.0")).await;
    assert_eq!(envelope.status_code, 200);
    assert!(envelope.body.contains("release/1.0"));
}

#[tokio::test]
async fn encoded_reference_matches_on_v2() {
    let envelope = invoke(api_gateway_v2_event("GET", "/api/v2/trees/release%2F1.0")).await;
    assert_eq!(envelope.status_code, 200);
    let reference: ReferenceDto = serde_json::from_str(&envelope.body).unwrap();
    assert_eq!(reference.name, "release/1.0");
}

#[tokio::test]
async fn unknown_reference_is_404_problem() {
    let envelope = invoke(api_gateway_v2_event("GET", "/api/v2/trees/nope")).await;
    assert_eq!(envelope.status_code, 404);
    assert_eq!(
        envelope.headers.get("content-type").map(String::as_str),
        Some("application/problem+json")
    );
    assert!(problem(&envelope).detail.unwrap().contains("nope"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let envelope = invoke(api_gateway_v2_event("POST", "/unknown")).await;
    assert_eq!(envelope.status_code, 404);
    assert_eq!(problem(&envelope).type_uri, "/problems/not-found");
}

#[tokio::test]
async fn wrong_method_is_405_with_allow() {
    let payload = with_json_body(
        api_gateway_v2_event("POST", "/api/v2/config"),
        &json!({"defaultBranch": "dev"}),
    );
    let envelope = invoke(payload).await;

    assert_eq!(envelope.status_code, 405);
    assert_eq!(envelope.headers.get("allow").map(String::as_str), Some("GET"));
}

#[tokio::test]
async fn missing_method_is_400() {
    let envelope = invoke(json!({"version": "2.0", "rawPath": "/api/v2/config"})).await;
    assert_eq!(envelope.status_code, 400);
    assert_eq!(problem(&envelope).type_uri, "/problems/invalid-request");
}

#[tokio::test]
async fn health_reports_service_name() {
    let envelope = invoke(api_gateway_v2_event("GET", "/health/ready")).await;
    assert_eq!(envelope.status_code, 200);
    assert!(envelope.body.contains("catalog-test"));
}

#[tokio::test]
async fn invalid_catalog_config_fails_the_invocation() {
    let cache: &'static ColdStartCache<ApplicationContext> =
        Box::leak(Box::new(ColdStartCache::new()));
    let entrypoint = InvocationEntrypoint::new(cache, ApiGatewayAdapter::new(), || {
        catalog_lambda::validate_reference_name("..")?;
        build_context("catalog-test", catalog())
    });

    let result = entrypoint
        .invoke(LambdaEvent::new(
            api_gateway_v2_event("GET", "/api/v2/config"),
            lambda_context("init-failure"),
        ))
        .await;

    assert!(result.is_err());
    assert_eq!(entrypoint.phase(), Phase::Cold);
    assert!(!cache.is_initialized());
}

#[tokio::test]
async fn context_is_reused_across_invocations() {
    let entrypoint = entrypoint();

    for suffix in ["first", "second", "third"] {
        let envelope = entrypoint
            .invoke(LambdaEvent::new(
                api_gateway_v2_event("GET", "/api/v1/config"),
                lambda_context(suffix),
            ))
            .await
            .unwrap();
        assert_eq!(envelope.status_code, 200);
    }

    let context = entrypoint.context().expect("warm context");
    assert_eq!(context.service(), "catalog-test");
    assert_eq!(entrypoint.phase(), Phase::Warm);
}
