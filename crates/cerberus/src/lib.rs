//! # Cerberus
//!
//! **Specification-enforcing HTTP routing**
//!
//! Cerberus binds request handlers to operations of a Swagger 2.0 or
//! OpenAPI 3 document and enforces that document on every request:
//!
//! - Registering a handler for an operation the document does not declare
//!   fails immediately
//! - Parameters and bodies are validated, coerced and defaulted before the
//!   handler runs
//! - Cross-origin access is restricted to the methods a path declares
//! - Undeclared methods on a known path get a uniform `405` listing the
//!   allowed ones
//! - Sibling templates (`/widgets?variant=a`, `/widgets?variant=b`) are told
//!   apart by `x-conditional-validation-rules`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cerberus::prelude::*;
//!
//! async fn list_pets(request: Request) -> Response {
//!     let validated = request.extensions().get::<ValidatedRequest>();
//!     // ...
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("cerberus.toml")?
//!         .with_env_prefix("CERBERUS")
//!         .load()?;
//!     cerberus::init_logging(&config)?;
//!
//!     let mut router = SpecRouter::from_config(&config).await?;
//!     router.route("/pets").get(list_pets)?;
//!
//!     // hand requests from your server to `router.dispatch(request).await`
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every registered route runs a fixed chain:
//!
//! ```text
//! Request → CORS (declared methods) → Contract validation → user layers → Handler
//! ```
//!
//! Paths also receive generated chains:
//!
//! ```text
//! OPTIONS            → CORS → 204 + Allow
//! undeclared method  → CORS → 405 "{path} does not allow {METHOD}.\nAllowed methods: ..."
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod spec_router;

pub use spec_router::{cors_from_section, RouteBuilder, SpecRouter, REQUEST_ID_HEADER};

/// Error taxonomy and request identity.
pub use cerberus_core as core;

/// Host radix router.
pub use cerberus_router as router;

/// Specification index, resolution and validation.
pub use cerberus_contract as contract;

/// Handler chains and stages.
pub use cerberus_middleware as middleware;

/// Logging setup.
pub use cerberus_telemetry as telemetry;

/// Layered configuration.
pub use cerberus_config as config;

/// Installs the global log subscriber described by `config.logging`.
///
/// # Errors
///
/// Fails on an invalid level or if a subscriber is already installed.
pub fn init_logging(config: &cerberus_config::CerberusConfig) -> cerberus_telemetry::TelemetryResult<()> {
    cerberus_telemetry::init_logging(&cerberus_telemetry::LogConfig::from(&config.logging))
}

/// Common imports.
pub mod prelude {
    pub use crate::{RouteBuilder, SpecRouter};
    pub use cerberus_config::{CerberusConfig, ConfigLoader};
    pub use cerberus_contract::{Contract, ContractError, SpecDocument, ValidatedRequest, ValidationConfig};
    pub use cerberus_core::{CerberusError, RequestId};
    pub use cerberus_middleware::{
        BoxFuture, Middleware, MiddlewareContext, Next, Request, Response, ResponseExt,
    };
}
