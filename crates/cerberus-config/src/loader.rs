//! Layered configuration loading.
//!
//! Layers are applied in order, later ones overriding earlier ones:
//! 1. Defaults (or a development/production preset)
//! 2. A TOML or JSON file
//! 3. Environment variables of the form `PREFIX__SECTION__KEY`

use std::env;
use std::fs;
use std::path::Path;

use crate::{CerberusConfig, ConfigError, SpecFormat};
use cerberus_telemetry::LogFormat;

/// Configuration loader with layered approach.
///
/// # Example
///
/// ```no_run
/// use cerberus_config::ConfigLoader;
///
/// # fn main() -> Result<(), cerberus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("cerberus.toml")?
///     .with_env_prefix("CERBERUS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: CerberusConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CerberusConfig::default(),
            env_prefix: None,
        }
    }

    /// Reset to default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = CerberusConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// ```
    /// use cerberus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = CerberusConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = CerberusConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::missing(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;
        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `toml` or `json` format.
    ///
    /// ```
    /// use cerberus_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [spec]
    ///     path = "api/swagger.yaml"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.spec.path.as_deref(), Some("api/swagger.yaml"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::invalid(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// With prefix `CERBERUS`:
    /// - `CERBERUS__SPEC__PATH=api/swagger.json`
    /// - `CERBERUS__CORS__ALLOWED_ORIGINS=https://a.example,https://b.example`
    /// - `CERBERUS__LOGGING__FORMAT=pretty`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file in the working directory, if any.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(err) if err.not_found() => Ok(self),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation
    /// fails.
    pub fn load(self) -> Result<CerberusConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse.
    pub fn load_unvalidated(mut self) -> Result<CerberusConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            let mut vars: Vec<(String, String)> =
                env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
            vars.sort();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }
        Ok(self.config)
    }

    fn parse_file(content: &str, path: &Path) -> Result<CerberusConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::invalid(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let rest = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::bad_env_var(key, "invalid key format"))?;

        let parts: Vec<&str> = rest.split("__").collect();
        let boolean = || parse_bool(value).ok_or_else(|| ConfigError::bad_env_var(key, "expected boolean"));

        match parts.as_slice() {
            ["SPEC", "PATH"] => {
                self.config.spec.path = (!value.is_empty()).then(|| value.to_string());
            }
            ["SPEC", "FORMAT"] => {
                self.config.spec.format = match value.to_lowercase().as_str() {
                    "auto" => SpecFormat::Auto,
                    "json" => SpecFormat::Json,
                    "yaml" | "yml" => SpecFormat::Yaml,
                    _ => return Err(ConfigError::bad_env_var(key, "expected 'auto', 'json' or 'yaml'")),
                };
            }

            ["VALIDATION", "ENABLED"] => self.config.validation.enabled = boolean()?,
            ["VALIDATION", "VALIDATE_BODY"] => self.config.validation.validate_body = boolean()?,
            ["VALIDATION", "COERCE_TYPES"] => self.config.validation.coerce_types = boolean()?,
            ["VALIDATION", "APPLY_DEFAULTS"] => self.config.validation.apply_defaults = boolean()?,
            ["VALIDATION", "VALIDATE_FORMATS"] => self.config.validation.validate_formats = boolean()?,

            ["CORS", "ALLOWED_ORIGINS"] => self.config.cors.allowed_origins = parse_list(value),
            ["CORS", "ALLOWED_HEADERS"] => self.config.cors.allowed_headers = parse_list(value),
            ["CORS", "EXPOSE_HEADERS"] => self.config.cors.expose_headers = parse_list(value),
            ["CORS", "ALLOW_CREDENTIALS"] => self.config.cors.allow_credentials = boolean()?,
            ["CORS", "MAX_AGE_SECS"] => {
                self.config.cors.max_age_secs = if value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ConfigError::bad_env_var(key, "expected integer or 'none'")
                    })?)
                };
            }

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = boolean()?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::bad_env_var(key, "expected 'json' or 'pretty'")),
                };
            }

            // Variables for other tools may share the prefix.
            _ => {}
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
