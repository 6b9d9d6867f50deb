//! High-level router API.

use http::Method;

use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::params::Params;
use crate::RouteMatch;

/// A radix tree router mapping `(method, path)` to a handler of type `T`.
///
/// # Example
///
/// ```rust
/// use cerberus_router::{Router, MethodRouter};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert("/pets", MethodRouter::new().get("listPets").post("createPet"));
/// router.route(&Method::GET, "/pets/{petId}", "getPet");
///
/// let found = router.match_route(&Method::GET, "/pets/7").unwrap();
/// assert_eq!(*found.handler, "getPet");
/// assert_eq!(found.params.get("petId"), Some("7"));
/// ```
///
/// # Route Priority
///
/// 1. **Static segments** (e.g., `/pets/mine`)
/// 2. **Parameter segments** (e.g., `/pets/{id}`)
/// 3. **Wildcard segments** (e.g., `/files/*path`)
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Inserts a route, merging with methods already registered for the path.
    pub fn insert(&mut self, path: &str, methods: MethodRouter<T>) {
        self.entry(path).merge(methods);
    }

    /// Returns the method router for a path, creating it if needed.
    pub fn entry(&mut self, path: &str) -> &mut MethodRouter<T> {
        let (methods, created) = self.root.entry(path);
        if created {
            self.route_count += 1;
        }
        methods
    }

    /// Registers a single handler, replacing any previous handler for that method.
    pub fn route(&mut self, method: &Method, path: &str, handler: T) {
        self.entry(path).set(method, handler);
    }

    /// Matches a path and method against the router.
    ///
    /// Falls back to the path's wildcard handler when the method has no slot.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let (methods, params) = self.root.match_path(path)?;
        let handler = methods.handler(method)?;
        Some(RouteMatch::new(handler, params))
    }

    /// Matches a path against the router (without method).
    ///
    /// Useful for checking allowed methods or generating 405 responses.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        self.root.match_path(path)
    }

    /// Returns the number of distinct route endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
