//! Structured logging for Cerberus.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either a
//! JSON formatter (production) or a pretty formatter (development).
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! tracing::info!(template = "/pets/{petId}", "route registered");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format of the log formatter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

/// How [`init_logging`] sets up the subscriber.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `false` skips installation entirely.
    pub enabled: bool,

    /// Level or filter directive (e.g. `info`, `cerberus_contract=debug,warn`).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Emit an event when a span opens and closes.
    pub span_events: bool,

    /// Attach source file and line to each event.
    pub file_line_info: bool,

    /// Attach the emitting thread's ID.
    pub thread_ids: bool,

    /// Attach the module path of the call site.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Verbose pretty output for local work.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// `info` level JSON lines for log shippers.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Returns `true` when output is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == LogFormat::Json
    }
}

/// Installs the global subscriber described by `config`.
///
/// Does nothing when `config.enabled` is false.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad level and
/// [`TelemetryError::LoggingInit`] when a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    tracing_subscriber::registry()
        .with(fmt_layer::<Registry>(config).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Formatter layer for `config`, boxed so both formats share one type.
fn fmt_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
{
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Parses a level or filter directive into an [`EnvFilter`].
///
/// A bare word must be a level name (`trace` through `error`, or `off`);
/// anything containing `=` or `,` is parsed as a full directive list.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the string does not parse.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    let invalid = |reason: String| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason,
    };

    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty filter".to_string()));
    }

    if !trimmed.contains(['=', ',']) {
        let level: LevelFilter = trimmed.parse().map_err(|e| invalid(format!("{e}")))?;
        return Ok(EnvFilter::default().add_directive(level.into()));
    }

    EnvFilter::try_new(trimmed).map_err(|e| invalid(e.to_string()))
}

/// Field names shared by Cerberus log events.
pub mod fields {
    /// Value of `x-request-id`.
    pub const REQUEST_ID: &str = "request_id";
    /// `operationId` of the matched operation.
    pub const OPERATION_ID: &str = "operation_id";
    /// Path template as written in the specification.
    pub const TEMPLATE: &str = "template";
    /// Upper-cased request method.
    pub const HTTP_METHOD: &str = "http.method";
    /// Request path without query.
    pub const HTTP_PATH: &str = "http.path";
    /// Response status.
    pub const HTTP_STATUS: &str = "http.status_code";
    /// Time spent in dispatch, in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";
    /// Display text of an error.
    pub const ERROR: &str = "error";
}

/// Logs a request that completed with a success or redirect status.
#[macro_export]
macro_rules! log_request_complete {
    ($request_id:expr, $method:expr, $path:expr, $status:expr, $duration_ms:expr) => {
        $crate::tracing::info!(
            request_id = %$request_id,
            http.method = %$method,
            http.path = %$path,
            http.status_code = $status,
            duration_ms = $duration_ms,
            "Request completed"
        );
    };
}

/// Logs a request turned away by routing, policy, or validation.
#[macro_export]
macro_rules! log_request_rejected {
    ($request_id:expr, $method:expr, $path:expr, $status:expr, $duration_ms:expr) => {
        $crate::tracing::warn!(
            request_id = %$request_id,
            http.method = %$method,
            http.path = %$path,
            http.status_code = $status,
            duration_ms = $duration_ms,
            "Request rejected"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.is_json());
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_preset_is_verbose_and_pretty() {
        let dev = LogConfig::development();
        assert!(!dev.is_json());
        assert!(dev.span_events && dev.file_line_info);
        assert_eq!(dev.level, "debug");
    }

    #[test]
    fn test_format_serde() {
        let format: LogFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert!(serde_json::from_str::<LogFormat>("\"xml\"").is_err());
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("OFF").is_ok());
        assert!(create_env_filter("warn,cerberus_contract=debug").is_ok());

        assert!(matches!(
            create_env_filter("loud"),
            Err(TelemetryError::InvalidFilter { .. })
        ));
        assert!(create_env_filter("  ").is_err());
    }

    #[test]
    fn test_disabled_config_skips_filter_parsing() {
        let config = LogConfig {
            enabled: false,
            level: "not a level".to_string(),
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_invalid_level_rejected_before_install() {
        let config = LogConfig {
            level: "loud".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_request_macros_expand() {
        log_request_complete!("req-1", "GET", "/pets", 200u16, 3u64);
        log_request_rejected!("req-2", "DELETE", "/pets", 405u16, 1u64);
    }
}
