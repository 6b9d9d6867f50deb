//! Parameter and body validation against operation schemas.
//!
//! Parameters in `path`, `query` and `header` are validated together against
//! one synthesized object schema:
//!
//! ```text
//! { "path": {...}, "query": {...}, "header": {...} }
//! ```
//!
//! The body is validated separately against its own schema. Both checks
//! always run and their errors are reported together.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::coerce::{apply_defaults, coerce_raw, raw_value};
use crate::config::ValidationConfig;
use crate::error::{ContractError, ContractResult, FieldError};
use crate::index::Operation;
use crate::parameter::{Parameter, ParameterLocation};
use crate::request::{RequestBody, RequestParts};

/// Sections of the synthesized parameter schema, in error-reporting order.
const PARAMETER_SECTIONS: [ParameterLocation; 3] = [
    ParameterLocation::Path,
    ParameterLocation::Query,
    ParameterLocation::Header,
];

/// A request that passed validation, with coerced and defaulted values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRequest {
    /// Path parameters, keyed by specification name.
    pub path: Map<String, Value>,
    /// Query parameters.
    pub query: Map<String, Value>,
    /// Header parameters, keyed by lower-cased name.
    pub header: Map<String, Value>,
    /// The JSON body, with defaults applied.
    pub body: Option<Value>,
}

impl ValidatedRequest {
    /// Returns a path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&Value> {
        self.path.get(name)
    }

    /// Returns a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Returns a header parameter, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.header.get(&name.to_ascii_lowercase())
    }

    fn section_mut(&mut self, location: ParameterLocation) -> Option<&mut Map<String, Value>> {
        match location {
            ParameterLocation::Path => Some(&mut self.path),
            ParameterLocation::Query => Some(&mut self.query),
            ParameterLocation::Header => Some(&mut self.header),
            _ => None,
        }
    }
}

struct CompiledBody {
    parameter: Arc<Parameter>,
    root: Value,
    validator: Validator,
}

struct CompiledOperation {
    parameters: Vec<Arc<Parameter>>,
    parameter_validator: Validator,
    body: Option<CompiledBody>,
}

/// Validates requests against resolved operations.
///
/// Compiled schemas are cached per operation.
pub struct ParameterValidator {
    config: ValidationConfig,
    shared: Map<String, Value>,
    cache: DashMap<String, Arc<CompiledOperation>>,
}

impl fmt::Debug for ParameterValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterValidator")
            .field("config", &self.config)
            .field("compiled_operations", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ParameterValidator {
    /// Creates a validator. `shared` holds the document sections that
    /// schemas may reference (`definitions`, `components`).
    #[must_use]
    pub fn new(config: ValidationConfig, shared: Map<String, Value>) -> Self {
        Self {
            config,
            shared,
            cache: DashMap::new(),
        }
    }

    /// Returns the validation configuration.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Number of operations compiled so far.
    #[must_use]
    pub fn compiled_operations(&self) -> usize {
        self.cache.len()
    }

    /// Validates a request against an operation.
    ///
    /// `path_params` must be keyed by the specification's placeholder names.
    pub fn validate(
        &self,
        operation: &Operation,
        request: &RequestParts,
        path_params: &HashMap<String, String>,
    ) -> ContractResult<ValidatedRequest> {
        let compiled = self.compiled(operation)?;
        let mut validated = ValidatedRequest::default();
        let mut errors = Vec::new();

        for param in &compiled.parameters {
            let raw = match param.location {
                ParameterLocation::Path => path_params.get(&param.name).cloned().into_iter().collect(),
                ParameterLocation::Query => request.query.get(&param.name).cloned().unwrap_or_default(),
                ParameterLocation::Header => request.header_values(&param.name),
                _ => continue,
            };

            let value = if self.config.coerce_types {
                coerce_raw(&raw, &param.schema, param.collection_format)
            } else {
                raw_value(&raw, &param.schema)
            };
            let value = value.or_else(|| {
                self.config
                    .apply_defaults
                    .then(|| param.default_value().cloned())
                    .flatten()
            });

            if let (Some(value), Some(section)) = (value, validated.section_mut(param.location)) {
                section.insert(param.name.clone(), value);
            }
        }

        if self.config.validate_requests {
            let instance = json!({
                "path": validated.path,
                "query": validated.query,
                "header": validated.header,
            });
            errors.extend(
                compiled
                    .parameter_validator
                    .iter_errors(&instance)
                    .map(|e| FieldError::new(parameter_error_location(&e), e.to_string())),
            );
        }

        validated.body = match &compiled.body {
            Some(body) => self.validate_body(body, &request.body, &mut errors),
            None => request.body.json().cloned(),
        };

        if errors.is_empty() {
            Ok(validated)
        } else {
            debug!(
                operation = %operation.template,
                method = %operation.method,
                errors = errors.len(),
                "request failed validation"
            );
            Err(ContractError::RequestValidation { errors })
        }
    }

    fn validate_body(
        &self,
        compiled: &CompiledBody,
        body: &RequestBody,
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let check = self.config.validate_requests && self.config.validate_body;

        match body {
            RequestBody::Empty => {
                if check && compiled.parameter.required {
                    errors.push(FieldError::new("body", "request body is required"));
                }
                None
            }
            RequestBody::Invalid(reason) => {
                if check {
                    errors.push(FieldError::new("body", format!("invalid JSON: {reason}")));
                }
                None
            }
            RequestBody::Json(value) => {
                let mut value = value.clone();
                if self.config.apply_defaults {
                    apply_defaults(&mut value, &compiled.parameter.schema, &compiled.root);
                }
                if check {
                    errors.extend(
                        compiled
                            .validator
                            .iter_errors(&value)
                            .map(|e| FieldError::new(body_error_location(&e), e.to_string())),
                    );
                }
                Some(value)
            }
        }
    }

    fn compiled(&self, operation: &Operation) -> ContractResult<Arc<CompiledOperation>> {
        let key = format!("{} {}", operation.method, operation.template);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Arc::clone(cached.value()));
        }

        let compiled = Arc::new(self.compile(operation, &key)?);
        Ok(Arc::clone(self.cache.entry(key).or_insert(compiled).value()))
    }

    fn compile(&self, operation: &Operation, key: &str) -> ContractResult<CompiledOperation> {
        let mut parameters = Vec::new();
        let mut body = None;
        let mut sections: HashMap<ParameterLocation, (Map<String, Value>, Vec<Value>)> = HashMap::new();

        for param in operation.unique_parameters() {
            match param.location {
                ParameterLocation::Path | ParameterLocation::Query | ParameterLocation::Header => {
                    let (properties, required) = sections.entry(param.location).or_default();
                    properties.insert(param.name.clone(), param.schema.clone());
                    if param.required {
                        required.push(Value::String(param.name.clone()));
                    }
                    parameters.push(param);
                }
                ParameterLocation::Body => {
                    let root = self.schema_root(&param.schema);
                    let validator = self.build_validator(&root, &format!("{key} body"))?;
                    body = Some(CompiledBody {
                        parameter: param,
                        root,
                        validator,
                    });
                }
                ParameterLocation::FormData | ParameterLocation::Cookie => {
                    debug!(
                        operation = key,
                        name = %param.name,
                        location = %param.location,
                        "parameter location not validated"
                    );
                }
            }
        }

        let mut properties = Map::new();
        for location in PARAMETER_SECTIONS {
            let (props, required) = sections.remove(&location).unwrap_or_default();
            let mut section = Map::new();
            section.insert("type".to_string(), json!("object"));
            section.insert("properties".to_string(), Value::Object(props));
            if !required.is_empty() {
                section.insert("required".to_string(), Value::Array(required));
            }
            properties.insert(location.as_str().to_string(), Value::Object(section));
        }

        let schema = self.schema_root(&json!({"type": "object", "properties": properties}));
        let parameter_validator = self.build_validator(&schema, &format!("{key} parameters"))?;

        debug!(operation = key, parameters = parameters.len(), "compiled operation schemas");

        Ok(CompiledOperation {
            parameters,
            parameter_validator,
            body,
        })
    }

    /// Attaches the shared sections so local `$ref`s resolve.
    fn schema_root(&self, schema: &Value) -> Value {
        let mut root = schema.clone();
        if let Value::Object(object) = &mut root {
            for (key, value) in &self.shared {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        root
    }

    fn build_validator(&self, schema: &Value, location: &str) -> ContractResult<Validator> {
        jsonschema::options()
            .with_draft(Draft::Draft4)
            .should_validate_formats(self.config.validate_formats)
            .build(schema)
            .map_err(|e| ContractError::InvalidSchema {
                location: location.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Splits a JSON pointer into unescaped segments.
fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn required_property(kind: &ValidationErrorKind) -> Option<String> {
    match kind {
        ValidationErrorKind::Required { property } => Some(
            property
                .as_str()
                .map_or_else(|| property.to_string(), ToString::to_string),
        ),
        _ => None,
    }
}

/// Maps a parameter schema error to `section.name`.
fn parameter_error_location(error: &ValidationError<'_>) -> String {
    let mut segments = pointer_segments(&error.instance_path.to_string());
    if let Some(property) = required_property(&error.kind) {
        segments.push(property);
    }
    if segments.is_empty() {
        "parameters".to_string()
    } else {
        segments.join(".")
    }
}

/// Maps a body schema error to `body/<instance path>`.
///
/// Errors at the document root fall back to the last property named in the
/// schema path.
fn body_error_location(error: &ValidationError<'_>) -> String {
    let mut instance = pointer_segments(&error.instance_path.to_string());
    if let Some(property) = required_property(&error.kind) {
        instance.push(property);
    }
    if !instance.is_empty() {
        return format!("body/{}", instance.join("/"));
    }

    let schema = pointer_segments(&error.schema_path.to_string());
    schema
        .iter()
        .rposition(|s| s == "properties")
        .and_then(|i| schema.get(i + 1))
        .map_or_else(|| "body".to_string(), |property| format!("body/{property}"))
}
