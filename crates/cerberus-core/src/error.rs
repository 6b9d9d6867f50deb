//! Error types for Cerberus.
//!
//! [`CerberusError`] is what the host framework sees once a request has been
//! turned away or the specification turned out to be broken. Every variant
//! knows its status code and renders into the same JSON [`ErrorEnvelope`].
//!
//! # Categories
//!
//! | `ErrorCategory` | Status | Meaning |
//! |---|---|---|
//! | `Validation` | 400 | Request does not satisfy the declared parameters or body |
//! | `NotFound` | 404 | No route is registered for the request path |
//! | `MethodNotAllowed` | 405 | Path is declared, method is not |
//! | `Configuration` | 500 | Specification defect (bad reference, missing rule) |
//! | `Internal` | 500 | Anything else |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Shorthand for results failing with [`CerberusError`].
pub type CerberusResult<T> = Result<T, CerberusError>;

/// Coarse classification of a [`CerberusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Parameters or body break the declared schema.
    Validation,
    /// No route matched the request path.
    NotFound,
    /// The path exists but does not declare the requested method.
    MethodNotAllowed,
    /// The specification itself is inconsistent.
    Configuration,
    /// Failures unrelated to the request or the specification.
    Internal,
}

impl ErrorCategory {
    /// Status code a response in this category carries.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code written into envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Configuration => "SPECIFICATION_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// A rejected request or a broken specification.
///
/// # Example
///
/// ```
/// use cerberus_core::{CerberusError, ErrorCategory, FieldErrors};
///
/// let mut fields = FieldErrors::new();
/// fields.add("query.limit", "\"abc\" is not of type \"integer\"");
///
/// let error = CerberusError::validation_with_fields("request validation failed", fields);
/// assert_eq!(error.category(), ErrorCategory::Validation);
/// assert_eq!(error.status_code().as_u16(), 400);
/// ```
#[derive(Error, Debug)]
pub enum CerberusError {
    /// The request broke the declared parameters or body.
    #[error("Validation error: {message}")]
    Validation {
        /// Summary shown to the client.
        message: String,
        /// Per-location failures, when known.
        #[source]
        field_errors: Option<FieldErrors>,
    },

    /// No route registered for the path.
    #[error("Not found: {message}")]
    NotFound {
        /// Summary shown to the client.
        message: String,
    },

    /// Method not declared for a known path.
    #[error("Method not allowed: {path} does not allow {method}")]
    MethodNotAllowed {
        /// The requested method, upper-cased.
        method: String,
        /// The requested path.
        path: String,
        /// Methods the path does declare, upper-cased.
        allowed: Vec<String>,
    },

    /// The specification is inconsistent with what was requested of it.
    #[error("Specification error: {message}")]
    Configuration {
        /// What is wrong with the document.
        message: String,
    },

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Summary shown to the client.
        message: String,
        /// Cause, kept out of the envelope.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl CerberusError {
    /// A validation failure without per-field detail.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// A validation failure listing each offending location.
    #[must_use]
    pub fn validation_with_fields(message: impl Into<String>, fields: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(fields),
        }
    }

    /// No route for a path.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// `method` is not declared on `path`; `allowed` lists what is.
    #[must_use]
    pub fn method_not_allowed<I, S>(
        method: impl AsRef<str>,
        path: impl Into<String>,
        allowed: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::MethodNotAllowed {
            method: method.as_ref().to_uppercase(),
            path: path.into(),
            allowed: allowed
                .into_iter()
                .map(|m| m.as_ref().to_uppercase())
                .collect(),
        }
    }

    /// A defect in the specification document.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// An unexpected failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// An unexpected failure caused by `source`.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Status code of the response this error becomes.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Per-location failures of a validation error.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { field_errors, .. } => field_errors.as_ref(),
            _ => None,
        }
    }

    /// Machine-readable code, such as `VALIDATION_ERROR`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        self.category().code()
    }

    /// Renders the JSON body sent to the client.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.details(),
            },
            request_id: request_id.map(str::to_owned),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation {
                field_errors: Some(fields),
                ..
            } => serde_json::to_value(fields).ok(),
            Self::MethodNotAllowed { allowed, .. } => {
                Some(serde_json::json!({ "allowed_methods": allowed }))
            }
            _ => None,
        }
    }
}

/// Validation failures keyed by request location.
///
/// Keys look like `body/name`, `query.limit` or `header.x-api-key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{} invalid field(s)", .fields.len())]
pub struct FieldErrors {
    /// Messages per location, sorted by location.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of distinct locations with failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldErrors
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut errors = Self::new();
        for (field, message) in iter {
            errors.add(field, message);
        }
        errors
    }
}

/// JSON body of every error response.
///
/// ```json
/// {"error": {"code": "NOT_FOUND", "message": "...", "category": "not_found"}, "request_id": "..."}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// What went wrong.
    pub error: ErrorDetail,
    /// Correlates the response with logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The `error` object of an [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// See [`ErrorCategory::code`].
    pub code: String,
    /// Display text of the error.
    pub message: String,
    /// Category, in snake case.
    pub category: ErrorCategory,
    /// Field failures or allowed methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
