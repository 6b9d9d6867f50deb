//! # Cerberus Middleware
//!
//! Handler chains for contract-checked routes.
//!
//! Every route registered through the specification runs the same fixed
//! sequence of stages:
//!
//! ```text
//! Request → CORS policy → Contract validation → user layers → Handler
//! ```
//!
//! | Stage | Type | Purpose |
//! |-------|------|---------|
//! | 1 | [`CorsMiddleware`] | Preflight answers and origin headers, limited to declared methods |
//! | 2 | [`ContractValidationMiddleware`] | Parameter and body validation |
//! | 3 | user [`Middleware`] | Application layers |
//! | 4 | [`Handler`] | Application handler |
//!
//! Undeclared methods get a chain ending in [`MethodNotAllowed`], and
//! `OPTIONS` gets one ending in [`Preflight`].
//!
//! ## Example
//!
//! ```
//! use cerberus_middleware::{HandlerChain, Request, Response};
//! use cerberus_middleware::stages::CorsMiddleware;
//!
//! let chain = HandlerChain::builder()
//!     .policy(CorsMiddleware::default())
//!     .build(|_request: Request| async { Response::default() });
//!
//! assert_eq!(chain.stage_names(), vec!["cors"]);
//! ```

#![doc(html_root_url = "https://docs.rs/cerberus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{BoxedHandler, BoxedMiddleware, Handler, HandlerChain, HandlerChainBuilder};
pub use stages::{ContractValidationMiddleware, CorsMiddleware, MethodNotAllowed, Preflight};
pub use types::{Request, Response, ResponseExt};
