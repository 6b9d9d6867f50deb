//! Specification index.
//!
//! [`SpecIndex::build`] walks the document's `paths` once and produces one
//! [`RouteEntry`] per path template. Operations are resolved lazily, on first
//! match, and cached: each `$ref` token is resolved once per index and each
//! operation once per entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::SpecDocument;
use crate::error::{ContractError, ContractResult};
use crate::negotiation::AllowedMethods;
use crate::parameter::{Parameter, ParameterLocation};
use crate::pattern::PathPattern;

/// Method keys recognized in a path item. `all` is the wildcard.
pub const RECOGNIZED_METHODS: [&str; 9] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "all",
];

/// Longest `$ref` chain followed before giving up.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Preferred media type when lifting an OpenAPI 3 `requestBody`.
const JSON_MEDIA_TYPE: &str = "application/json";

/// A resolved operation: one method's contract for one path.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Lower-cased method key.
    pub method: String,
    /// Specification template of the owning entry.
    pub template: String,
    /// The `operationId`, if declared.
    pub operation_id: Option<String>,
    /// Method-level parameters followed by path-level ones, all resolved.
    pub parameters: Vec<Arc<Parameter>>,
}

impl Operation {
    /// Returns parameters with duplicates removed. The first `(in, name)`
    /// occurrence wins, so method-level declarations shadow path-level ones.
    #[must_use]
    pub fn unique_parameters(&self) -> Vec<Arc<Parameter>> {
        let mut seen = Vec::with_capacity(self.parameters.len());
        let mut unique = Vec::with_capacity(self.parameters.len());
        for param in &self.parameters {
            let key = param.key();
            if !seen.contains(&key) {
                seen.push(key);
                unique.push(Arc::clone(param));
            }
        }
        unique
    }

    /// Returns the body parameter after deduplication.
    #[must_use]
    pub fn body_parameter(&self) -> Option<Arc<Parameter>> {
        self.unique_parameters()
            .into_iter()
            .find(|p| p.location == ParameterLocation::Body)
    }
}

/// An unresolved operation as declared, with its resolve-once slot.
#[derive(Debug)]
struct OperationDef {
    raw: Value,
    resolved: OnceLock<Arc<Operation>>,
}

/// One specification path template and its declared methods.
#[derive(Debug)]
pub struct RouteEntry {
    pattern: PathPattern,
    methods: IndexMap<String, OperationDef>,
    path_parameters: Vec<Value>,
    policy_defined: AtomicBool,
    allowed: OnceLock<AllowedMethods>,
}

impl RouteEntry {
    /// Returns the template as written in the specification.
    #[must_use]
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns `true` if the entry declares the method (case-insensitive).
    #[must_use]
    pub fn declares(&self, method: &str) -> bool {
        self.methods.contains_key(&method.to_ascii_lowercase())
    }

    /// Returns the declared method keys in document order.
    pub fn method_keys(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Marks the method policy as installed.
    ///
    /// Returns `true` for exactly one caller over the entry's lifetime.
    pub fn claim_policy(&self) -> bool {
        self.policy_defined
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns `true` once the policy has been claimed.
    #[must_use]
    pub fn policy_defined(&self) -> bool {
        self.policy_defined.load(Ordering::Acquire)
    }

    /// Returns the declared methods, computed on first use.
    pub fn allowed_methods(&self) -> &AllowedMethods {
        self.allowed
            .get_or_init(|| AllowedMethods::from_keys(self.methods.keys()))
    }
}

/// Indexed specification.
#[derive(Debug)]
pub struct SpecIndex {
    document: SpecDocument,
    entries: Vec<Arc<RouteEntry>>,
    references: DashMap<String, Arc<Parameter>>,
}

impl SpecIndex {
    /// Builds the index. The document is not modified.
    pub fn build(document: SpecDocument) -> ContractResult<Self> {
        let mut entries = Vec::new();

        if let Some(paths) = document.paths() {
            for (template, item) in paths {
                let item = item.as_object().ok_or_else(|| ContractError::InvalidSchema {
                    location: template.clone(),
                    reason: "path item must be an object".to_string(),
                })?;
                entries.push(Arc::new(Self::build_entry(template, item)?));
            }
        }

        debug!(entries = entries.len(), "specification index built");

        Ok(Self {
            document,
            entries,
            references: DashMap::new(),
        })
    }

    fn build_entry(template: &str, item: &Map<String, Value>) -> ContractResult<RouteEntry> {
        let pattern = PathPattern::compile(template)?;

        let mut methods = IndexMap::new();
        let mut path_parameters = Vec::new();

        for (key, value) in item {
            let key = key.to_ascii_lowercase();
            if key == "parameters" {
                path_parameters = value.as_array().cloned().unwrap_or_default();
            } else if RECOGNIZED_METHODS.contains(&key.as_str()) {
                methods.insert(
                    key,
                    OperationDef {
                        raw: value.clone(),
                        resolved: OnceLock::new(),
                    },
                );
            }
        }

        debug!(
            template,
            methods = methods.len(),
            path_parameters = path_parameters.len(),
            "indexed path"
        );

        Ok(RouteEntry {
            pattern,
            methods,
            path_parameters,
            policy_defined: AtomicBool::new(false),
            allowed: OnceLock::new(),
        })
    }

    /// Returns the indexed document.
    #[must_use]
    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    /// Returns all entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    /// Finds an entry by its exact template.
    #[must_use]
    pub fn entry(&self, template: &str) -> Option<&Arc<RouteEntry>> {
        self.entries.iter().find(|e| e.template() == template)
    }

    /// Number of distinct references resolved so far.
    #[must_use]
    pub fn resolved_references(&self) -> usize {
        self.references.len()
    }

    /// Returns the resolved operation for a method of an entry.
    ///
    /// Resolution happens once; later calls return the same `Arc`.
    pub fn operation(&self, entry: &RouteEntry, method: &str) -> ContractResult<Option<Arc<Operation>>> {
        let method = method.to_ascii_lowercase();
        let Some(def) = entry.methods.get(&method) else {
            return Ok(None);
        };

        if let Some(op) = def.resolved.get() {
            return Ok(Some(Arc::clone(op)));
        }

        let op = Arc::new(self.resolve_operation(entry, &method, &def.raw)?);
        Ok(Some(Arc::clone(def.resolved.get_or_init(|| op))))
    }

    fn resolve_operation(&self, entry: &RouteEntry, method: &str, raw: &Value) -> ContractResult<Operation> {
        let context = format!("{} {}", method.to_ascii_uppercase(), entry.template());

        let declared = raw
            .get("parameters")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .chain(entry.path_parameters.iter());

        let mut parameters = Vec::new();
        for param in declared {
            parameters.push(self.resolve_parameter(param, &context)?);
        }

        if let Some(body) = raw.get("requestBody") {
            if let Some(param) = self.request_body_parameter(body, &context)? {
                parameters.push(Arc::new(param));
            }
        }

        debug!(
            operation = %context,
            parameters = parameters.len(),
            "resolved operation"
        );

        Ok(Operation {
            method: method.to_string(),
            template: entry.template().to_string(),
            operation_id: raw
                .get("operationId")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            parameters,
        })
    }

    fn resolve_parameter(&self, raw: &Value, context: &str) -> ContractResult<Arc<Parameter>> {
        let Some(token) = raw.get("$ref").and_then(Value::as_str) else {
            return Ok(Arc::new(Parameter::from_value(raw, context)?));
        };

        if let Some(cached) = self.references.get(token) {
            return Ok(Arc::clone(cached.value()));
        }

        let target = self.follow_reference(token)?;
        let param = Arc::new(Parameter::from_value(target, token)?);
        debug!(reference = token, name = %param.name, "resolved parameter reference");

        Ok(Arc::clone(
            self.references
                .entry(token.to_string())
                .or_insert(param)
                .value(),
        ))
    }

    /// Follows a chain of local references to its final target.
    fn follow_reference(&self, token: &str) -> ContractResult<&Value> {
        let unresolved = || ContractError::UnresolvedReference {
            reference: token.to_string(),
        };

        let mut current = token;
        for _ in 0..MAX_REFERENCE_DEPTH {
            let pointer = current.strip_prefix('#').ok_or_else(unresolved)?;
            if pointer.split('/').filter(|s| !s.is_empty()).count() < 2 {
                return Err(unresolved());
            }
            let target = self.document.pointer(pointer).ok_or_else(unresolved)?;
            match target.get("$ref").and_then(Value::as_str) {
                Some(next) => current = next,
                None => return Ok(target),
            }
        }
        Err(unresolved())
    }

    /// Lifts an OpenAPI 3 `requestBody` into a `body` parameter.
    fn request_body_parameter(&self, raw: &Value, context: &str) -> ContractResult<Option<Parameter>> {
        let body = match raw.get("$ref").and_then(Value::as_str) {
            Some(token) => self.follow_reference(token)?,
            None => raw,
        };

        let Some(content) = body.get("content").and_then(Value::as_object) else {
            return Ok(None);
        };

        let media = content
            .get(JSON_MEDIA_TYPE)
            .or_else(|| {
                content
                    .iter()
                    .find(|(media_type, _)| media_type.contains("json"))
                    .map(|(_, v)| v)
            })
            .or_else(|| content.values().next());

        let Some(schema) = media.and_then(|m| m.get("schema")) else {
            return Ok(None);
        };

        let mut param = Map::new();
        param.insert("name".to_string(), Value::String("body".to_string()));
        param.insert("in".to_string(), Value::String("body".to_string()));
        param.insert(
            "required".to_string(),
            Value::Bool(body.get("required").and_then(Value::as_bool).unwrap_or(false)),
        );
        param.insert("schema".to_string(), schema.clone());

        Parameter::from_value(&Value::Object(param), context).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index(doc: Value) -> SpecIndex {
        SpecIndex::build(SpecDocument::from_value(doc).unwrap()).unwrap()
    }

    fn petstore() -> SpecIndex {
        index(json!({
            "swagger": "2.0",
            "parameters": {
                "limit": {"name": "limit", "in": "query", "type": "integer", "default": 20},
                "limitAlias": {"$ref": "#/parameters/limit"},
                "loopA": {"$ref": "#/parameters/loopB"},
                "loopB": {"$ref": "#/parameters/loopA"}
            },
            "paths": {
                "/pets": {
                    "GET": {
                        "operationId": "listPets",
                        "parameters": [{"$ref": "#/parameters/limit"}]
                    },
                    "post": {"operationId": "createPet"},
                    "summary": "ignored",
                    "x-internal": true
                },
                "/pets/{petId}": {
                    "parameters": [
                        {"name": "petId", "in": "path", "type": "string"},
                        {"name": "X-Trace", "in": "header", "type": "string"}
                    ],
                    "get": {
                        "parameters": [
                            {"name": "petId", "in": "path", "type": "integer"},
                            {"$ref": "#/parameters/limitAlias"}
                        ]
                    },
                    "delete": {"parameters": [{"$ref": "#/parameters/loopA"}]},
                    "put": {"parameters": [{"$ref": "#/parameters/missing"}]}
                }
            }
        }))
    }

    #[test]
    fn test_method_keys_lowercased_and_filtered() {
        let index = petstore();
        let entry = index.entry("/pets").unwrap();
        assert_eq!(entry.method_keys().collect::<Vec<_>>(), vec!["get", "post"]);
        assert!(entry.declares("GET"));
        assert!(!entry.declares("summary"));
    }

    #[test]
    fn test_reference_resolved_once() {
        let index = petstore();
        let entry = index.entry("/pets").unwrap();

        let first = index.operation(entry, "get").unwrap().unwrap();
        let second = index.operation(entry, "GET").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.operation_id.as_deref(), Some("listPets"));
        assert_eq!(first.parameters[0].name, "limit");
        assert_eq!(index.resolved_references(), 1);
    }

    #[test]
    fn test_reference_chain_followed() {
        let index = petstore();
        let entry = index.entry("/pets/{petId}").unwrap();
        let op = index.operation(entry, "get").unwrap().unwrap();

        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["petId", "limit", "petId", "x-trace"]);
    }

    #[test]
    fn test_method_level_parameter_shadows_path_level() {
        let index = petstore();
        let entry = index.entry("/pets/{petId}").unwrap();
        let op = index.operation(entry, "get").unwrap().unwrap();

        let unique = op.unique_parameters();
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].schema, json!({"type": "integer"}));
    }

    #[test]
    fn test_reference_cycle_is_unresolved() {
        let index = petstore();
        let entry = index.entry("/pets/{petId}").unwrap();
        let err = index.operation(entry, "delete").unwrap_err();
        assert!(matches!(err, ContractError::UnresolvedReference { reference } if reference == "#/parameters/loopA"));
    }

    #[test]
    fn test_missing_reference_is_unresolved() {
        let index = petstore();
        let entry = index.entry("/pets/{petId}").unwrap();
        assert!(matches!(
            index.operation(entry, "put"),
            Err(ContractError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_undeclared_method_is_none() {
        let index = petstore();
        let entry = index.entry("/pets").unwrap();
        assert!(index.operation(entry, "patch").unwrap().is_none());
    }

    #[test]
    fn test_claim_policy_once() {
        let index = petstore();
        let entry = index.entry("/pets").unwrap();
        assert!(!entry.policy_defined());
        assert!(entry.claim_policy());
        assert!(!entry.claim_policy());
        assert!(entry.policy_defined());
    }

    #[test]
    fn test_allowed_methods_memoized() {
        let index = petstore();
        let entry = index.entry("/pets/{petId}").unwrap();
        let first: *const AllowedMethods = entry.allowed_methods();
        let second: *const AllowedMethods = entry.allowed_methods();
        assert_eq!(first, second);
        assert_eq!(entry.allowed_methods().header_value(), "GET,PUT,DELETE");
    }

    #[test]
    fn test_openapi3_request_body() {
        let index = index(json!({
            "openapi": "3.0.0",
            "components": {
                "requestBodies": {
                    "Pet": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}
                    }
                }
            },
            "paths": {
                "/pets": {"post": {"requestBody": {"$ref": "#/components/requestBodies/Pet"}}}
            }
        }));
        let entry = index.entry("/pets").unwrap();
        let op = index.operation(entry, "post").unwrap().unwrap();
        let body = op.body_parameter().unwrap();
        assert!(body.required);
        assert_eq!(body.schema, json!({"$ref": "#/components/schemas/Pet"}));
    }

    #[test]
    fn test_invalid_template_fails_build() {
        let doc = SpecDocument::from_value(json!({"paths": {"/pets/{id": {"get": {}}}})).unwrap();
        assert!(matches!(
            SpecIndex::build(doc),
            Err(ContractError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_document_not_mutated() {
        let doc = SpecDocument::from_value(json!({
            "parameters": {"limit": {"name": "limit", "in": "query"}},
            "paths": {"/pets": {"get": {"parameters": [{"$ref": "#/parameters/limit"}]}}}
        }))
        .unwrap();
        let before = doc.root().clone();
        let index = SpecIndex::build(doc).unwrap();
        let entry = Arc::clone(index.entry("/pets").unwrap());
        index.operation(&entry, "get").unwrap();
        assert_eq!(index.document().root(), &before);
    }
}
