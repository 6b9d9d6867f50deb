//! Logging setup for Cerberus.
//!
//! Every Cerberus crate emits through `tracing` with structured fields. This
//! crate installs the subscriber that formats them:
//!
//! - **Production**: JSON, one object per event, `info` and above
//! - **Development**: pretty multi-line output, `debug` and above, span events
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

#[doc(hidden)]
pub use tracing;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
