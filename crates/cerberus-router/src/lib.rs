//! Radix tree host router for Cerberus.
//!
//! Cerberus installs one handler chain per `(path, method)` pair into this
//! router: user chains for declared methods, plus the preflight and
//! method-not-allowed chains generated from the specification.
//!
//! # Features
//!
//! - **Generic handlers**: `Router<T>` stores any handler type
//! - **Path Parameters**: `/pets/{id}` and `/pets/:id` are both accepted
//! - **Wildcards**: Catch-all routes (`/files/*path`)
//! - **Wildcard method slot**: backs `all` registrations, explicit methods win
//!
//! # Example
//!
//! ```rust
//! use cerberus_router::{Router, MethodRouter};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert("/pets", MethodRouter::new().get(1).post(2));
//! router.insert("/pets/{id}", MethodRouter::new().get(3).any(4));
//!
//! let found = router.match_route(&Method::DELETE, "/pets/9").unwrap();
//! assert_eq!(*found.handler, 4);
//! assert_eq!(found.params.get("id"), Some("9"));
//! ```

mod method_router;
mod node;
mod params;
mod router;

pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::Router;

/// A matched route with its handler and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The handler registered for the matched route
    pub handler: &'a T,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(handler: &'a T, params: Params) -> Self {
        Self { handler, params }
    }
}
