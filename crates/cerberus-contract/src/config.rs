//! Configuration for request validation.

use serde::{Deserialize, Serialize};

/// Toggles for the parameter and body validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Whether to validate requests at all. When off, parameters are passed
    /// through as raw strings.
    pub validate_requests: bool,
    /// Whether to validate the JSON body.
    pub validate_body: bool,
    /// Convert string parameters to their declared types.
    pub coerce_types: bool,
    /// Fill absent values from schema defaults.
    pub apply_defaults: bool,
    /// Enforce `format` keywords (`date-time`, `email`, `uuid`, ...).
    pub validate_formats: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_requests: true,
            validate_body: true,
            coerce_types: true,
            apply_defaults: true,
            validate_formats: false,
        }
    }
}

impl ValidationConfig {
    /// Create a strict configuration that validates everything.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            validate_formats: true,
            ..Self::default()
        }
    }

    /// Create a permissive configuration: nothing is rejected, values are
    /// still coerced and defaulted for handlers.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            validate_requests: false,
            validate_body: false,
            coerce_types: true,
            apply_defaults: true,
            validate_formats: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validation_config() {
        let config = ValidationConfig::default();
        assert!(config.validate_requests);
        assert!(config.validate_body);
        assert!(config.coerce_types);
        assert!(config.apply_defaults);
        assert!(!config.validate_formats);
    }

    #[test]
    fn test_strict_validation_config() {
        let config = ValidationConfig::strict();
        assert!(config.validate_requests);
        assert!(config.validate_formats);
    }

    #[test]
    fn test_permissive_validation_config() {
        let config = ValidationConfig::permissive();
        assert!(!config.validate_requests);
        assert!(!config.validate_body);
        assert!(config.coerce_types);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ValidationConfig = serde_json::from_str(r#"{"validate_formats": true}"#).unwrap();
        assert!(config.validate_formats);
        assert!(config.validate_requests);
    }
}
