//! Per-request state shared by the stages of a chain.
//!
//! [`MiddlewareContext`] holds the request ID, what validation resolved
//! (template and `operationId`), the host router's captures and a typed
//! extension map for anything stages want to hand downstream.

use cerberus_core::RequestId;
use http::Extensions;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// State carried alongside a request through its chain.
///
/// # Example
///
/// ```
/// use cerberus_middleware::context::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_route_template("/pets/{petId}".to_string());
///
/// assert_eq!(ctx.route_template(), Some("/pets/{petId}"));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    route_template: Option<String>,
    operation_id: Option<String>,
    path_params: HashMap<String, String>,
    started_at: Instant,
    extensions: Extensions,
}

impl MiddlewareContext {
    /// A context with a freshly generated request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// A context reusing an ID that arrived with the request.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            route_template: None,
            operation_id: None,
            path_params: HashMap::new(),
            started_at: Instant::now(),
            extensions: Extensions::new(),
        }
    }

    /// ID used in logs and error envelopes.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Template validation selected, such as `/widgets?variant=legacy`.
    #[must_use]
    pub fn route_template(&self) -> Option<&str> {
        self.route_template.as_deref()
    }

    /// Records the selected template.
    pub fn set_route_template(&mut self, template: String) {
        self.route_template = Some(template);
    }

    /// `operationId` of the selected operation, when declared.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Records the selected `operationId`.
    pub fn set_operation_id(&mut self, operation_id: String) {
        self.operation_id = Some(operation_id);
    }

    /// Captures the host router made from the request path.
    #[must_use]
    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Replaces the host router's captures.
    pub fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores `value`, replacing an earlier value of the same type.
    ///
    /// ```
    /// use cerberus_middleware::context::MiddlewareContext;
    ///
    /// #[derive(Clone)]
    /// struct Tenant(String);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(Tenant("acme".to_string()));
    ///
    /// assert_eq!(ctx.get_extension::<Tenant>().map(|t| t.0.as_str()), Some("acme"));
    /// ```
    pub fn set_extension<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(value);
    }

    /// The stored value of type `T`.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Takes the stored value of type `T` out of the context.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions.remove::<T>()
    }

    /// Whether a value of type `T` is stored.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.get_extension::<T>().is_some()
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
