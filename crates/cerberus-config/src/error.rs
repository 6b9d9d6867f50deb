//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("configuration file not found: {path}")]
    Missing {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A file exists but could not be read.
    #[error("cannot read configuration file {path}")]
    Unreadable {
        /// The file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A TOML layer did not match the schema.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON layer did not match the schema.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value that parses but makes no sense.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, such as `logging.level`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be parsed for its key.
    #[error("cannot parse environment variable {var}: {reason}")]
    BadEnvVar {
        /// Full variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A `.env` file exists but is malformed or unreadable.
    #[error("cannot load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// The loader was used incorrectly, such as an unsupported file extension.
    #[error("configuration rejected: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// See [`ConfigError::Missing`].
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    /// See [`ConfigError::Unreadable`].
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// See [`ConfigError::InvalidValue`].
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// See [`ConfigError::BadEnvVar`].
    pub fn bad_env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadEnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// See [`ConfigError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
