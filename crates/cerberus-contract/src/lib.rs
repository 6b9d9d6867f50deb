//! Cerberus Contract - Specification-Driven Request Validation
//!
//! This crate turns a Swagger 2.0 / OpenAPI 3 document into a request
//! contract: it indexes the document's paths, resolves an incoming path and
//! method to the operations that declare them, picks one when sibling
//! templates compete, and validates the request's parameters and body.
//!
//! # Architecture
//!
//! ```text
//!      SpecDocument (JSON / YAML)
//!              │ build once
//!      ┌───────▼──────────┐
//!      │    SpecIndex     │  patterns, lazy $ref cache
//!      └───────┬──────────┘
//!              │ path + method
//!      ┌───────▼──────────┐
//!      │OperationResolver │  every matching entry
//!      └───────┬──────────┘
//!              │ candidates
//!      ┌───────▼──────────┐
//!      │    RuleTable     │  x-conditional-validation-rules
//!      └───────┬──────────┘
//!              │ one operation
//!      ┌───────▼──────────┐
//!      │ParameterValidator│  coerce, default, JSON Schema
//!      └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cerberus_contract::{Contract, RequestParts, ValidationConfig};
//!
//! let contract = Contract::from_file("petstore.yaml", ValidationConfig::default()).await?;
//!
//! let request = RequestParts::new(http::Method::GET, "/pets/7?limit=5");
//! let validated = contract.validate_request("get", &request)?;
//! assert_eq!(validated.query_param("limit"), Some(&serde_json::json!(5)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coerce;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod negotiation;
pub mod parameter;
pub mod pattern;
pub mod request;
pub mod resolver;
pub mod rules;
pub mod validation;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use config::ValidationConfig;
pub use document::SpecDocument;
pub use error::{ContractError, ContractResult, FieldError};
pub use index::{Operation, RouteEntry, SpecIndex};
pub use negotiation::{AllowedMethods, DEFAULT_DENY_METHODS};
pub use parameter::{CollectionFormat, Parameter, ParameterLocation};
pub use pattern::{decode_segment, normalize_template, PathPattern};
pub use request::{RequestBody, RequestParts};
pub use resolver::{MatchResult, OperationResolver};
pub use rules::{RuleTable, ValidationRule};
pub use validation::{ParameterValidator, ValidatedRequest};

/// A loaded specification, ready to resolve and validate requests.
///
/// `Contract` is built once and shared behind an `Arc` by every handler
/// chain. All caches inside it are safe for concurrent use.
#[derive(Debug)]
pub struct Contract {
    config: ValidationConfig,
    index: Arc<SpecIndex>,
    resolver: OperationResolver,
    rules: RuleTable,
    validator: ParameterValidator,
}

impl Contract {
    /// Create a contract from a parsed document.
    ///
    /// # Errors
    ///
    /// Fails if a path template or the rule section is malformed.
    pub fn new(document: SpecDocument, config: ValidationConfig) -> ContractResult<Self> {
        let rules = RuleTable::from_document(&document)?;
        let validator = ParameterValidator::new(config.clone(), document.shared_sections());
        let index = Arc::new(SpecIndex::build(document)?);
        let resolver = OperationResolver::new(Arc::clone(&index));

        Ok(Self {
            config,
            index,
            resolver,
            rules,
            validator,
        })
    }

    /// Create a contract with the default validation configuration.
    pub fn with_defaults(document: SpecDocument) -> ContractResult<Self> {
        Self::new(document, ValidationConfig::default())
    }

    /// Loads a JSON or YAML document from disk and builds the contract.
    pub async fn from_file(path: impl AsRef<Path>, config: ValidationConfig) -> ContractResult<Self> {
        let document = SpecDocument::from_file(path).await?;
        Self::new(document, config)
    }

    /// Returns every operation that matches `path` and `method`.
    pub fn resolve(&self, path: &str, method: &str) -> ContractResult<Vec<MatchResult>> {
        self.resolver.resolve(path, method)
    }

    /// Picks one candidate for a request using the conditional rules.
    pub fn select<'m>(
        &self,
        matches: &'m [MatchResult],
        request: &RequestParts,
    ) -> ContractResult<&'m MatchResult> {
        self.rules.select(matches, request)
    }

    /// Validates a request against a selected operation.
    ///
    /// Path parameters are re-captured from the request path with the
    /// specification's placeholder names. Host captures fill any gaps. Both
    /// are percent-decoded.
    pub fn validate(&self, selected: &MatchResult, request: &RequestParts) -> ContractResult<ValidatedRequest> {
        let mut path_params: HashMap<String, String> = request
            .params
            .iter()
            .map(|(name, raw)| (name.clone(), decode_segment(raw)))
            .collect();
        if let Some(captures) = selected.entry.pattern().captures(&request.path) {
            path_params.extend(captures);
        }
        self.validator.validate(&selected.operation, request, &path_params)
    }

    /// Resolves, selects and validates in one step.
    ///
    /// `method` is the specification key to resolve against. It is usually
    /// the request method, or `all` for wildcard registrations.
    pub fn validate_request(&self, method: &str, request: &RequestParts) -> ContractResult<ValidatedRequest> {
        let matches = self.resolve(&request.path, method)?;
        let selected = self.select(&matches, request)?;
        self.validate(selected, request)
    }

    /// Returns the specification index.
    #[must_use]
    pub fn index(&self) -> &Arc<SpecIndex> {
        &self.index
    }

    /// Returns the conditional rule table.
    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Returns the specification document.
    #[must_use]
    pub fn document(&self) -> &SpecDocument {
        self.index.document()
    }

    /// Returns the validation configuration.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }
}
