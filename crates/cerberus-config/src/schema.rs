//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use cerberus_contract::ValidationConfig;
use cerberus_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Encoding of the specification document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    /// Detect from the file extension.
    #[default]
    Auto,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl SpecFormat {
    /// Resolves `Auto` against a file path. Returns `None` when the
    /// extension is not one of `json`, `yaml` or `yml`.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Option<Self> {
        match self {
            Self::Auto => match path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .as_deref()
            {
                Some("json") => Some(Self::Json),
                Some("yaml" | "yml") => Some(Self::Yaml),
                _ => None,
            },
            explicit => Some(explicit),
        }
    }
}

/// Specification document location.
///
/// # Example
///
/// ```
/// use cerberus_config::{SpecConfig, SpecFormat};
///
/// let spec = SpecConfig {
///     path: Some("api/swagger.yaml".into()),
///     format: SpecFormat::Auto,
/// };
/// assert_eq!(spec.resolved_format(), Some(SpecFormat::Yaml));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SpecConfig {
    /// Path to the specification file.
    #[serde(default)]
    pub path: Option<String>,

    /// Document encoding.
    #[serde(default)]
    pub format: SpecFormat,
}

impl SpecConfig {
    /// Returns the concrete format, or `None` if it cannot be determined.
    #[must_use]
    pub fn resolved_format(&self) -> Option<SpecFormat> {
        let path = self.path.as_deref()?;
        self.format.resolve(Path::new(path))
    }
}

/// Request validation toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidationSection {
    /// Validate parameters and bodies. When off, values pass through.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Validate JSON request bodies.
    #[serde(default = "default_true")]
    pub validate_body: bool,

    /// Convert string parameters to their declared types.
    #[serde(default = "default_true")]
    pub coerce_types: bool,

    /// Fill absent values from schema defaults.
    #[serde(default = "default_true")]
    pub apply_defaults: bool,

    /// Enforce `format` keywords.
    #[serde(default)]
    pub validate_formats: bool,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            validate_body: true,
            coerce_types: true,
            apply_defaults: true,
            validate_formats: false,
        }
    }
}

impl From<&ValidationSection> for ValidationConfig {
    fn from(section: &ValidationSection) -> Self {
        Self {
            validate_requests: section.enabled,
            validate_body: section.enabled && section.validate_body,
            coerce_types: section.coerce_types,
            apply_defaults: section.apply_defaults,
            validate_formats: section.validate_formats,
        }
    }
}

/// Cross-origin settings.
///
/// Allowed methods are not configurable: each path allows exactly the
/// methods its specification entry declares.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsSection {
    /// Allowed origins. `*` allows any origin.
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,

    /// Allowed request headers (lowercase). `*` echoes the requested ones.
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to scripts.
    #[serde(default)]
    pub expose_headers: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Preflight cache lifetime. `None` omits the header.
    #[serde(default = "default_max_age")]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_headers: default_allowed_headers(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

impl CorsSection {
    /// Returns `true` when any origin is allowed.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Level or filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl From<&LoggingSection> for LogConfig {
    fn from(section: &LoggingSection) -> Self {
        let preset = match section.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        Self {
            enabled: section.enabled,
            level: section.level.clone(),
            ..preset
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allowed_headers() -> Vec<String> {
    ["content-type", "authorization", "x-request-id"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_age() -> Option<u64> {
    Some(86_400)
}

fn default_log_level() -> String {
    "info".to_string()
}
