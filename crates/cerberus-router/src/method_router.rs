//! HTTP method-based dispatch for a single path.
//!
//! [`MethodRouter`] holds one handler slot per standard method plus a
//! wildcard slot used by `all` registrations. Explicit methods always win
//! over the wildcard.

use http::Method;

/// Maps HTTP methods to handlers for a single route.
///
/// # Example
///
/// ```rust
/// use cerberus_router::MethodRouter;
/// use http::Method;
///
/// let router = MethodRouter::new()
///     .get("listPets")
///     .post("createPet")
///     .any("fallback");
///
/// assert_eq!(router.handler(&Method::GET), Some(&"listPets"));
/// assert_eq!(router.handler(&Method::DELETE), Some(&"fallback"));
/// assert_eq!(router.explicit(&Method::DELETE), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    get: Option<T>,
    post: Option<T>,
    put: Option<T>,
    delete: Option<T>,
    patch: Option<T>,
    head: Option<T>,
    options: Option<T>,
    trace: Option<T>,
    connect: Option<T>,
    /// Handler for any method without an explicit slot.
    any: Option<T>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            get: None,
            post: None,
            put: None,
            delete: None,
            patch: None,
            head: None,
            options: None,
            trace: None,
            connect: None,
            any: None,
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates a new empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a GET handler.
    #[must_use]
    pub fn get(self, handler: T) -> Self {
        self.on(&Method::GET, handler)
    }

    /// Registers a POST handler.
    #[must_use]
    pub fn post(self, handler: T) -> Self {
        self.on(&Method::POST, handler)
    }

    /// Registers a PUT handler.
    #[must_use]
    pub fn put(self, handler: T) -> Self {
        self.on(&Method::PUT, handler)
    }

    /// Registers a DELETE handler.
    #[must_use]
    pub fn delete(self, handler: T) -> Self {
        self.on(&Method::DELETE, handler)
    }

    /// Registers a PATCH handler.
    #[must_use]
    pub fn patch(self, handler: T) -> Self {
        self.on(&Method::PATCH, handler)
    }

    /// Registers a HEAD handler.
    #[must_use]
    pub fn head(self, handler: T) -> Self {
        self.on(&Method::HEAD, handler)
    }

    /// Registers an OPTIONS handler.
    #[must_use]
    pub fn options(self, handler: T) -> Self {
        self.on(&Method::OPTIONS, handler)
    }

    /// Registers the wildcard handler.
    #[must_use]
    pub fn any(mut self, handler: T) -> Self {
        self.any = Some(handler);
        self
    }

    /// Registers a handler for a specific method.
    #[must_use]
    pub fn on(mut self, method: &Method, handler: T) -> Self {
        self.set(method, handler);
        self
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<T>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::DELETE => Some(&mut self.delete),
            Method::PATCH => Some(&mut self.patch),
            Method::HEAD => Some(&mut self.head),
            Method::OPTIONS => Some(&mut self.options),
            Method::TRACE => Some(&mut self.trace),
            Method::CONNECT => Some(&mut self.connect),
            _ => None,
        }
    }

    fn slot(&self, method: &Method) -> Option<&Option<T>> {
        match *method {
            Method::GET => Some(&self.get),
            Method::POST => Some(&self.post),
            Method::PUT => Some(&self.put),
            Method::DELETE => Some(&self.delete),
            Method::PATCH => Some(&self.patch),
            Method::HEAD => Some(&self.head),
            Method::OPTIONS => Some(&self.options),
            Method::TRACE => Some(&self.trace),
            Method::CONNECT => Some(&self.connect),
            _ => None,
        }
    }

    /// Sets the handler for a method, replacing any previous one.
    ///
    /// Extension methods have no slot; returns `false` for them and stores nothing.
    pub fn set(&mut self, method: &Method, handler: T) -> bool {
        match self.slot_mut(method) {
            Some(slot) => {
                *slot = Some(handler);
                true
            }
            None => false,
        }
    }

    /// Sets the handler for a method only if the slot is empty.
    ///
    /// Returns `true` if the handler was stored.
    pub fn set_if_absent(&mut self, method: &Method, handler: T) -> bool {
        match self.slot_mut(method) {
            Some(slot) if slot.is_none() => {
                *slot = Some(handler);
                true
            }
            _ => false,
        }
    }

    /// Sets the wildcard handler, replacing any previous one.
    pub fn set_any(&mut self, handler: T) {
        self.any = Some(handler);
    }

    /// Returns the handler registered for exactly this method.
    #[must_use]
    pub fn explicit(&self, method: &Method) -> Option<&T> {
        self.slot(method).and_then(Option::as_ref)
    }

    /// Returns the handler for a method, falling back to the wildcard.
    #[must_use]
    pub fn handler(&self, method: &Method) -> Option<&T> {
        self.explicit(method).or(self.any.as_ref())
    }

    /// Returns the wildcard handler, if any.
    #[must_use]
    pub fn any_handler(&self) -> Option<&T> {
        self.any.as_ref()
    }

    /// Merges another method router into this one.
    ///
    /// Slots already set in `self` are NOT overwritten.
    pub fn merge(&mut self, other: MethodRouter<T>) {
        fn fill<T>(slot: &mut Option<T>, other: Option<T>) {
            if slot.is_none() {
                *slot = other;
            }
        }
        fill(&mut self.get, other.get);
        fill(&mut self.post, other.post);
        fill(&mut self.put, other.put);
        fill(&mut self.delete, other.delete);
        fill(&mut self.patch, other.patch);
        fill(&mut self.head, other.head);
        fill(&mut self.options, other.options);
        fill(&mut self.trace, other.trace);
        fill(&mut self.connect, other.connect);
        fill(&mut self.any, other.any);
    }

    /// Returns true if any slot, including the wildcard, is set.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        self.any.is_some() || !self.allowed_methods().is_empty()
    }

    /// Returns the explicitly registered methods, in canonical order.
    ///
    /// The wildcard slot is not reported.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        [
            (Method::GET, self.get.is_some()),
            (Method::POST, self.post.is_some()),
            (Method::PUT, self.put.is_some()),
            (Method::DELETE, self.delete.is_some()),
            (Method::PATCH, self.patch.is_some()),
            (Method::HEAD, self.head.is_some()),
            (Method::OPTIONS, self.options.is_some()),
            (Method::TRACE, self.trace.is_some()),
            (Method::CONNECT, self.connect.is_some()),
        ]
        .into_iter()
        .filter_map(|(method, present)| present.then_some(method))
        .collect()
    }
}
