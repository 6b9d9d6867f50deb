//! Contract error types.

use std::fmt;

use cerberus_core::{CerberusError, FieldErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Errors raised while loading, indexing or enforcing a specification.
///
/// Every variant except [`ContractError::RequestValidation`] describes a
/// problem with the specification or with how routes were registered
/// against it. See [`ContractError::is_configuration`].
#[derive(Debug, Error)]
pub enum ContractError {
    /// Failed to read a specification document.
    #[error("failed to load specification: {0}")]
    Load(String),

    /// The specification document is not valid JSON or YAML.
    #[error("failed to parse specification: {0}")]
    Parse(String),

    /// A path template could not be compiled.
    #[error("invalid path template '{template}': {reason}")]
    InvalidPattern {
        /// The offending template.
        template: String,
        /// Why compilation failed.
        reason: String,
    },

    /// No specification entry declares this method for this path.
    #[error("[Method: \"{method}\"] operation not declared in specification: \"{path}\"")]
    OperationNotDeclared {
        /// Upper-cased HTTP method.
        method: String,
        /// Path as registered or requested.
        path: String,
    },

    /// A `$ref` token points nowhere, or loops.
    #[error("unresolved reference: {reference}")]
    UnresolvedReference {
        /// The reference token, e.g. `#/parameters/limit`.
        reference: String,
    },

    /// A parameter or schema in the specification is unusable.
    #[error("invalid schema at {location}: {reason}")]
    InvalidSchema {
        /// Where the schema was found.
        location: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Several operations match and no rule picks one.
    #[error("validation rules not found for \"{path}\"")]
    RulesNotFound {
        /// The request path.
        path: String,
    },

    /// A rule picked a target template that matches none of the candidates.
    #[error("validation rules not found: target \"{target}\" matches no operation for \"{path}\"")]
    RuleTargetNotFound {
        /// The request path.
        path: String,
        /// The template named by the rule.
        target: String,
    },

    /// The request violates the operation's parameter or body schemas.
    #[error("request validation failed: {} error(s)", errors.len())]
    RequestValidation {
        /// One entry per violation.
        errors: Vec<FieldError>,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Returns `true` for errors caused by the specification or registration
    /// rather than by the client request.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::RequestValidation { .. })
    }

    /// Returns the field errors of a request validation failure.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::RequestValidation { errors } => errors,
            _ => &[],
        }
    }
}

impl From<ContractError> for CerberusError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::RequestValidation { errors } => {
                let fields: FieldErrors = errors
                    .into_iter()
                    .map(|e| (e.location, e.message))
                    .collect();
                Self::validation_with_fields("request validation failed", fields)
            }
            other => Self::configuration(other.to_string()),
        }
    }
}

/// A single validation failure, addressed by request location.
///
/// Body locations use a slash (`body/name`); parameter locations use a dot
/// (`query.limit`, `header.x-api-key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Request location of the failure.
    pub location: String,
    /// Human readable message.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerberus_core::ErrorCategory;

    #[test]
    fn test_operation_not_declared_display() {
        let err = ContractError::OperationNotDeclared {
            method: "GET".to_string(),
            path: "/owners".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "[Method: \"GET\"] operation not declared in specification: \"/owners\""
        );
    }

    #[test]
    fn test_rule_errors_mention_rules_not_found() {
        let missing = ContractError::RulesNotFound {
            path: "/widgets".to_string(),
        };
        let target = ContractError::RuleTargetNotFound {
            path: "/widgets".to_string(),
            target: "/widgets?v=c".to_string(),
        };
        assert!(missing.to_string().contains("validation rules not found"));
        assert!(target.to_string().contains("validation rules not found"));
        assert!(target.to_string().contains("/widgets?v=c"));
    }

    #[test]
    fn test_is_configuration() {
        let validation = ContractError::RequestValidation { errors: vec![] };
        let reference = ContractError::UnresolvedReference {
            reference: "#/parameters/missing".to_string(),
        };
        assert!(!validation.is_configuration());
        assert!(reference.is_configuration());
    }

    #[test]
    fn test_request_validation_into_cerberus_error() {
        let err = ContractError::RequestValidation {
            errors: vec![
                FieldError::new("body/name", "\"name\" is a required property"),
                FieldError::new("query.limit", "\"x\" is not of type \"integer\""),
            ],
        };
        assert_eq!(err.field_errors().len(), 2);

        let err: CerberusError = err.into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        let fields = err.field_errors().unwrap();
        assert!(fields.get("body/name").is_some());
        assert!(fields.get("query.limit").is_some());
    }

    #[test]
    fn test_configuration_into_cerberus_error() {
        let err: CerberusError = ContractError::RulesNotFound {
            path: "/widgets".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.error_code(), "SPECIFICATION_ERROR");
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError::new("header.x-api-key", "is required");
        assert_eq!(err.to_string(), "header.x-api-key: is required");
    }
}
