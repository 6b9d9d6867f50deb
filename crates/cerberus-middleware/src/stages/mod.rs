//! Chain stages.
//!
//! - [`cors`] - CORS policy restricted to a path's declared methods
//! - [`validation`] - Contract validation of parameters and body
//! - [`policy`] - Terminal handlers for preflight and 405 chains

pub mod cors;
pub mod policy;
pub mod validation;

pub use cors::{AllowedOrigins, CorsBuilder, CorsMiddleware};
pub use policy::{MethodNotAllowed, Preflight};
pub use validation::ContractValidationMiddleware;
