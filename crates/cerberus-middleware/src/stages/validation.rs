//! Contract validation middleware.
//!
//! Buffers the request body, picks the specification operation for the
//! request and validates parameters and body against it. On success the
//! [`ValidatedRequest`] is stored both in the request extensions and in the
//! middleware context. On failure the chain stops:
//!
//! | Failure | Status | Code |
//! |---|---|---|
//! | Parameter or body violation | 400 | `VALIDATION_ERROR` |
//! | Missing rule, bad reference, undeclared operation | 500 | `SPECIFICATION_ERROR` |

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use cerberus_contract::{Contract, ContractResult, RequestParts, ValidatedRequest};
use cerberus_core::CerberusError;
use http_body_util::{BodyExt, Full};
use std::sync::Arc;
use tracing::{debug, error};

/// Validates requests against one registered operation.
#[derive(Debug, Clone)]
pub struct ContractValidationMiddleware {
    contract: Arc<Contract>,
    method: String,
}

impl ContractValidationMiddleware {
    /// Creates the stage for a registration.
    ///
    /// `method` is the specification key the route was registered for; it is
    /// `all` for wildcard registrations.
    #[must_use]
    pub fn new(contract: Arc<Contract>, method: impl Into<String>) -> Self {
        Self {
            contract,
            method: method.into().to_ascii_lowercase(),
        }
    }

    /// Returns the specification key this stage validates against.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    fn check(&self, ctx: &mut MiddlewareContext, view: &RequestParts) -> ContractResult<ValidatedRequest> {
        let matches = self.contract.resolve(&view.path, &self.method)?;
        let selected = self.contract.select(&matches, view)?;

        ctx.set_route_template(selected.entry.template().to_string());
        if let Some(operation_id) = &selected.operation.operation_id {
            ctx.set_operation_id(operation_id.clone());
        }

        self.contract.validate(selected, view)
    }
}

impl Middleware for ContractValidationMiddleware {
    fn name(&self) -> &'static str {
        "contract_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            let mut view = RequestParts::from_http(&parts, &bytes);
            view.params.clone_from(ctx.path_params());

            let request_id = ctx.request_id().to_string();
            match self.check(ctx, &view) {
                Ok(validated) => {
                    debug!(
                        request_id = %request_id,
                        method = %view.method,
                        path = %view.path,
                        template = ctx.route_template().unwrap_or_default(),
                        "request passed validation"
                    );
                    let mut request = Request::from_parts(parts, Full::new(bytes));
                    request.extensions_mut().insert(validated.clone());
                    ctx.set_extension(validated);
                    next.run(ctx, request).await
                }
                Err(err) if err.is_configuration() => {
                    error!(
                        request_id = %request_id,
                        method = %view.method,
                        path = %view.path,
                        error = %err,
                        "specification error while validating request"
                    );
                    Response::envelope(&CerberusError::from(err), Some(&request_id))
                }
                Err(err) => {
                    debug!(
                        request_id = %request_id,
                        method = %view.method,
                        path = %view.path,
                        errors = err.field_errors().len(),
                        "request rejected by contract"
                    );
                    Response::envelope(&CerberusError::from(err), Some(&request_id))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cerberus_contract::{SpecDocument, ValidationConfig};
    use http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn contract() -> Arc<Contract> {
        let document = SpecDocument::from_value(json!({
            "swagger": "2.0",
            "definitions": {
                "Pet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {"name": {"type": "string"}}
                }
            },
            "paths": {
                "/pets/{petId}": {
                    "put": {
                        "operationId": "updatePet",
                        "parameters": [
                            {"name": "petId", "in": "path", "type": "integer"},
                            {"name": "pet", "in": "body", "required": true, "schema": {"$ref": "#/definitions/Pet"}}
                        ]
                    }
                },
                "/feeds?kind=a": {"get": {}},
                "/feeds?kind=b": {"get": {}}
            }
        }))
        .unwrap();
        Arc::new(Contract::new(document, ValidationConfig::default()).unwrap())
    }

    fn request(method: Method, uri: &str, body: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    fn echo_validated() -> impl FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> {
        |_ctx, req| {
            Box::pin(async move {
                let validated = req.extensions().get::<ValidatedRequest>().cloned();
                let body = serde_json::to_vec(&validated).unwrap();
                Response::new(Full::new(Bytes::from(body)))
            })
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_reaches_handler() {
        let stage = ContractValidationMiddleware::new(contract(), "PUT");
        let mut ctx = MiddlewareContext::new();

        let response = stage
            .process(
                &mut ctx,
                request(Method::PUT, "/pets/7", r#"{"name":"rex"}"#),
                Next::handler(echo_validated()),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["path"]["petId"], 7);
        assert_eq!(json["body"]["name"], "rex");
        assert_eq!(ctx.route_template(), Some("/pets/{petId}"));
        assert_eq!(ctx.operation_id(), Some("updatePet"));
        assert!(ctx.has_extension::<ValidatedRequest>());
    }

    #[tokio::test]
    async fn test_invalid_request_gets_400_envelope() {
        let stage = ContractValidationMiddleware::new(contract(), "put");
        let mut ctx = MiddlewareContext::new();

        let response = stage
            .process(
                &mut ctx,
                request(Method::PUT, "/pets/abc", "{}"),
                Next::handler(echo_validated()),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert!(json["error"]["details"]["fields"]["body/name"].is_array());
        assert!(json["error"]["details"]["fields"]["path.petId"].is_array());
        assert_eq!(json["request_id"], ctx.request_id().to_string());
    }

    #[tokio::test]
    async fn test_missing_rule_is_specification_error() {
        let stage = ContractValidationMiddleware::new(contract(), "get");
        let mut ctx = MiddlewareContext::new();

        let response = stage
            .process(&mut ctx, request(Method::GET, "/feeds", ""), Next::handler(echo_validated()))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "SPECIFICATION_ERROR");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("validation rules not found"));
    }

    #[test]
    fn test_method_is_normalized() {
        let stage = ContractValidationMiddleware::new(contract(), "ALL");
        assert_eq!(stage.method(), "all");
        assert_eq!(stage.name(), "contract_validation");
    }
}
