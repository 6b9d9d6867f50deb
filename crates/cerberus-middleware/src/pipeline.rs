//! Fixed-order handler chains.
//!
//! Every route registered through the contract gets a [`HandlerChain`]:
//!
//! ```text
//! Request → Policy (CORS) → Validation → user layers → Handler
//! ```
//!
//! The policy and validation slots are optional so that generated chains
//! (preflight, 405) can reuse the same machinery. Their position is fixed;
//! user layers always run after validation and see the validated request.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a chain.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A terminal request handler.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = Response>`
/// closure. The validated request, when present, is available through
/// `request.extensions()`.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin(self(request))
    }
}

/// A type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// A composed chain for one `(path, method)` registration.
pub struct HandlerChain {
    policy: Option<BoxedMiddleware>,
    validation: Option<BoxedMiddleware>,
    layers: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
}

impl HandlerChain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> HandlerChainBuilder {
        HandlerChainBuilder::new()
    }

    /// Runs the request through every stage and the handler.
    pub async fn process(&self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        let handler = Arc::clone(&self.handler);
        let mut next = Next::handler(move |_ctx: &mut MiddlewareContext, request| handler.call(request));

        for middleware in self.stages().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next.run(ctx, request).await
    }

    fn stages(&self) -> impl DoubleEndedIterator<Item = &BoxedMiddleware> {
        self.policy
            .iter()
            .chain(self.validation.iter())
            .chain(self.layers.iter())
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages().map(|m| m.name()).collect()
    }

    /// Returns the number of stages, excluding the handler.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages().count()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`HandlerChain`].
#[derive(Default)]
pub struct HandlerChainBuilder {
    policy: Option<BoxedMiddleware>,
    validation: Option<BoxedMiddleware>,
    layers: Vec<BoxedMiddleware>,
}

impl HandlerChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy stage. It always runs first.
    #[must_use]
    pub fn policy(mut self, middleware: impl Middleware) -> Self {
        self.policy = Some(Arc::new(middleware));
        self
    }

    /// Sets the validation stage. It runs after the policy.
    #[must_use]
    pub fn validation(mut self, middleware: impl Middleware) -> Self {
        self.validation = Some(Arc::new(middleware));
        self
    }

    /// Appends a user layer.
    #[must_use]
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends already boxed user layers.
    #[must_use]
    pub fn layers<I>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.layers.extend(layers);
        self
    }

    /// Finishes the chain with its terminal handler.
    #[must_use]
    pub fn build(self, handler: impl Handler) -> HandlerChain {
        self.build_boxed(Arc::new(handler))
    }

    /// Finishes the chain with a shared handler.
    #[must_use]
    pub fn build_boxed(self, handler: BoxedHandler) -> HandlerChain {
        HandlerChain {
            policy: self.policy,
            validation: self.validation,
            layers: self.layers,
            handler,
        }
    }
}
