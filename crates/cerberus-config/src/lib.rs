//! Typed configuration for Cerberus.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`CERBERUS__SECTION__KEY`)
//! - `.env` files via `dotenvy`
//! - Strict parsing: unknown fields are errors
//!
//! # Example
//!
//! ```no_run
//! use cerberus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), cerberus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("cerberus.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("CERBERUS")
//!     .load()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [spec]
//! path = "api/swagger.yaml"
//! format = "auto"
//!
//! [validation]
//! enabled = true
//! validate_body = true
//! coerce_types = true
//! apply_defaults = true
//! validate_formats = false
//!
//! [cors]
//! allowed_origins = ["https://app.example.com"]
//! allowed_headers = ["content-type", "authorization"]
//! expose_headers = ["x-request-id"]
//! allow_credentials = true
//! max_age_secs = 600
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use cerberus_telemetry::LogFormat;
pub use config::CerberusConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CorsSection, LoggingSection, SpecConfig, SpecFormat, ValidationSection};
