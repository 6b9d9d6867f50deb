//! Integration tests for the contract against specification files on disk.
//!
//! `petstore.yaml` is a Swagger 2.0 document with shared parameters and
//! definitions; `widgets.json` is an OpenAPI 3 document whose sibling
//! templates are told apart by conditional validation rules.

use cerberus_contract::{Contract, ContractError, RequestParts, SpecDocument, ValidationConfig};
use http::Method;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn petstore() -> Contract {
    Contract::from_file(fixture("petstore.yaml"), ValidationConfig::default())
        .await
        .expect("petstore fixture should load")
}

async fn widgets() -> Contract {
    Contract::from_file(fixture("widgets.json"), ValidationConfig::default())
        .await
        .expect("widgets fixture should load")
}

fn locations(err: &ContractError) -> Vec<String> {
    let mut locations: Vec<_> = err.field_errors().iter().map(|e| e.location.clone()).collect();
    locations.sort();
    locations
}

// =============================================================================
// Swagger 2.0
// =============================================================================

#[tokio::test]
async fn test_query_coercion_and_defaults() {
    let contract = petstore().await;

    let request = RequestParts::new(Method::GET, "/pets?limit=5&tags=a,b").with_header("X-Api-Key", "k");
    let validated = contract.validate_request("GET", &request).unwrap();
    assert_eq!(validated.query_param("limit"), Some(&json!(5)));
    assert_eq!(validated.query_param("tags"), Some(&json!(["a", "b"])));
    assert_eq!(validated.header("x-api-key"), Some(&json!("k")));

    let request = RequestParts::new(Method::GET, "/pets").with_header("x-api-key", "k");
    let validated = contract.validate_request("get", &request).unwrap();
    assert_eq!(validated.query_param("limit"), Some(&json!(20)));
}

#[tokio::test]
async fn test_shared_parameter_errors_are_dotted() {
    let contract = petstore().await;

    let request = RequestParts::new(Method::GET, "/pets?limit=500");
    let err = contract.validate_request("GET", &request).unwrap_err();
    assert_eq!(locations(&err), vec!["header.x-api-key", "query.limit"]);
}

#[tokio::test]
async fn test_body_defaults_and_errors() {
    let contract = petstore().await;

    let request = RequestParts::new(Method::POST, "/pets")
        .with_header("X-Api-Key", "k")
        .with_json(json!({"name": "rex"}));
    let validated = contract.validate_request("POST", &request).unwrap();
    assert_eq!(validated.body, Some(json!({"name": "rex", "status": "available"})));

    let request = RequestParts::new(Method::POST, "/pets")
        .with_header("X-Api-Key", "k")
        .with_json(json!({"age": -1}));
    let err = contract.validate_request("POST", &request).unwrap_err();
    assert_eq!(locations(&err), vec!["body/age", "body/name"]);
}

#[tokio::test]
async fn test_body_and_parameter_errors_aggregate() {
    let contract = petstore().await;

    let request = RequestParts::new(Method::POST, "/pets").with_body(b"{not json");
    let err = contract.validate_request("POST", &request).unwrap_err();
    assert_eq!(locations(&err), vec!["body", "header.x-api-key"]);
    assert!(err.field_errors().iter().any(|e| e.message.starts_with("invalid JSON")));
}

#[tokio::test]
async fn test_path_parameter_and_trailing_slash() {
    let contract = petstore().await;

    let validated = contract
        .validate_request("DELETE", &RequestParts::new(Method::DELETE, "/pets/42/"))
        .unwrap();
    assert_eq!(validated.path_param("petId"), Some(&json!(42)));

    let validated = contract
        .validate_request("GET", &RequestParts::new(Method::GET, "/items/abc-1"))
        .unwrap();
    assert_eq!(validated.path_param("id"), Some(&json!("abc-1")));

    let err = contract
        .validate_request("GET", &RequestParts::new(Method::GET, "/items/ABC/"))
        .unwrap_err();
    assert_eq!(locations(&err), vec!["path.id"]);
}

#[tokio::test]
async fn test_undeclared_operation() {
    let contract = petstore().await;
    let err = contract
        .validate_request("PATCH", &RequestParts::new(Method::PATCH, "/pets"))
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(
        err.to_string(),
        r#"[Method: "PATCH"] operation not declared in specification: "/pets""#
    );
}

#[tokio::test]
async fn test_allowed_methods_from_file() {
    let contract = petstore().await;
    let entry = contract.index().entry("/pets/{petId}").unwrap();
    assert_eq!(entry.allowed_methods().header_value(), "GET,DELETE");
    assert_eq!(entry.allowed_methods().display_list(), "GET, DELETE");
}

// =============================================================================
// OpenAPI 3 with conditional rules
// =============================================================================

#[tokio::test]
async fn test_header_rule_selects_legacy_schema() {
    let contract = widgets().await;

    let request = RequestParts::new(Method::POST, "/widgets")
        .with_header("X-Variant", "legacy")
        .with_json(json!({"code": "W-1"}));
    assert!(contract.validate_request("POST", &request).is_ok());

    let request = RequestParts::new(Method::POST, "/widgets")
        .with_header("x-variant", "legacy")
        .with_json(json!({"sku": "W-1", "quantity": 2}));
    let err = contract.validate_request("POST", &request).unwrap_err();
    assert_eq!(locations(&err), vec!["body/code"]);
}

#[tokio::test]
async fn test_missing_header_uses_default_target() {
    let contract = widgets().await;

    let request = RequestParts::new(Method::POST, "/widgets").with_json(json!({"sku": "W-1"}));
    let err = contract.validate_request("POST", &request).unwrap_err();
    assert_eq!(locations(&err), vec!["body/quantity"]);

    let request = RequestParts::new(Method::POST, "/widgets/").with_json(json!({"sku": "W-1", "quantity": 1}));
    assert!(contract.validate_request("POST", &request).is_ok());
}

#[tokio::test]
async fn test_siblings_without_rule_fail() {
    let contract = widgets().await;
    let err = contract
        .validate_request("GET", &RequestParts::new(Method::GET, "/gadgets"))
        .unwrap_err();
    assert!(matches!(err, ContractError::RulesNotFound { .. }));
    assert!(err.to_string().contains("validation rules not found"));
}

#[tokio::test]
async fn test_missing_required_request_body() {
    let contract = widgets().await;
    let err = contract
        .validate_request("POST", &RequestParts::new(Method::POST, "/widgets"))
        .unwrap_err();
    assert_eq!(err.field_errors()[0].to_string(), "body: request body is required");
}

#[test]
fn test_yaml_and_json_documents_agree() {
    let yaml = SpecDocument::from_yaml("paths:\n  /a/{id}:\n    get: {}\n").unwrap();
    let json = SpecDocument::from_json(r#"{"paths": {"/a/{id}": {"get": {}}}}"#).unwrap();
    assert_eq!(yaml.root(), json.root());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_resolution_and_policy_claims() {
    const THREADS: usize = 8;

    let document = SpecDocument::from_value(json!({
        "swagger": "2.0",
        "parameters": {
            "limit": {"name": "limit", "in": "query", "type": "integer", "default": 20}
        },
        "paths": {
            "/pets": {"get": {"parameters": [{"$ref": "#/parameters/limit"}]}}
        }
    }))
    .unwrap();
    let contract = Contract::with_defaults(document).unwrap();
    let barrier = Barrier::new(THREADS);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let matches = contract.resolve("/pets", "get").unwrap();
                    let claimed = matches[0].entry.claim_policy();
                    (Arc::clone(&matches[0].operation), claimed)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|(_, claimed)| *claimed).count(), 1);
    let first = &results[0].0;
    assert!(results.iter().all(|(op, _)| Arc::ptr_eq(op, first)));
    assert_eq!(first.parameters[0].name, "limit");
    assert_eq!(contract.index().resolved_references(), 1);
    assert!(contract.index().entry("/pets").unwrap().policy_defined());
}
