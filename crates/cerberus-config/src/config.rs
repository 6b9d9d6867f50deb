//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, CorsSection, LoggingSection, SpecConfig, ValidationSection};
use cerberus_telemetry::LogFormat;

/// Complete Cerberus configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use cerberus_config::CerberusConfig;
///
/// let config = CerberusConfig::default();
/// assert!(config.validation.enabled);
/// assert_eq!(config.cors.allowed_origins, vec!["*"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CerberusConfig {
    /// Specification document location.
    #[serde(default)]
    pub spec: SpecConfig,

    /// Request validation toggles.
    #[serde(default)]
    pub validation: ValidationSection,

    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl CerberusConfig {
    /// Development preset: pretty `debug` logs and format checking.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.validation.validate_formats = true;
        config
    }

    /// Production preset: JSON `info` logs.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.format = LogFormat::Json;
        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the log level does not parse
    /// - the origin list is empty
    /// - the specification format cannot be determined
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(err) = cerberus_telemetry::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", err.to_string()));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(ConfigError::invalid_value(
                "cors.allowed_origins",
                "at least one origin (or \"*\") is required",
            ));
        }

        if let Some(path) = &self.spec.path {
            if self.spec.resolved_format().is_none() {
                return Err(ConfigError::invalid_value(
                    "spec.format",
                    format!("cannot determine document format of {path}; use .json, .yaml or .yml or set format"),
                ));
            }
        }

        Ok(())
    }
}
