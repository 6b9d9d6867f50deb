//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! Each specification path gets its own [`CorsMiddleware`], restricted to
//! the methods that path declares. A preflight asking for any other method
//! is refused with `403`, so browsers never send a request the contract
//! would reject.
//!
//! ## Example
//!
//! ```ignore
//! use cerberus_middleware::stages::CorsMiddleware;
//! use std::time::Duration;
//!
//! let cors = CorsMiddleware::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_headers(["Content-Type", "Authorization", "X-Variant"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(3600))
//!     .build();
//!
//! let per_path = cors.restricted_to(entry.allowed_methods());
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use cerberus_contract::{AllowedMethods, DEFAULT_DENY_METHODS};
use http::{HeaderValue, Method, StatusCode};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

/// Header names read and written by the CORS stage.
pub mod headers {
    pub use http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS as ALLOW_CREDENTIALS,
        ACCESS_CONTROL_ALLOW_HEADERS as ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS as ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN as ALLOW_ORIGIN,
        ACCESS_CONTROL_EXPOSE_HEADERS as EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE as MAX_AGE,
        ACCESS_CONTROL_REQUEST_HEADERS as REQUEST_HEADERS,
        ACCESS_CONTROL_REQUEST_METHOD as REQUEST_METHOD, ORIGIN, VARY,
    };
}

/// Per-path CORS policy.
///
/// A preflight (`OPTIONS` with `Origin` and `Access-Control-Request-Method`)
/// is answered here and never reaches the rest of the chain: `204` when the
/// origin, the requested method and every requested header pass, `403`
/// otherwise. Other requests run the chain, and a response to an allowed
/// origin gets the origin, credential and expose headers.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

/// Settings behind a [`CorsMiddleware`].
#[derive(Debug, Clone)]
pub struct CorsConfig {
    allowed_origins: AllowedOrigins,
    allowed_methods: AllowedMethods,
    allowed_headers: BTreeSet<String>,
    expose_headers: BTreeSet<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

/// Origins a policy accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// `*`.
    Any,
    /// Exact origins, such as `https://app.example.com`.
    List(BTreeSet<String>),
}

impl AllowedOrigins {
    /// Whether `origin` passes.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.contains(origin),
        }
    }

    /// `Access-Control-Allow-Origin` value answering `origin`.
    ///
    /// With credentials enabled a wildcard is answered with the request's
    /// own origin, since browsers reject `*` alongside credentials.
    #[must_use]
    pub fn header_value(&self, origin: &str, credentials: bool) -> Option<HeaderValue> {
        match self {
            Self::Any if !credentials => Some(HeaderValue::from_static("*")),
            Self::Any => HeaderValue::from_str(origin).ok(),
            Self::List(origins) if origins.contains(origin) => HeaderValue::from_str(origin).ok(),
            Self::List(_) => None,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            allowed_methods: AllowedMethods::from_keys(DEFAULT_DENY_METHODS.iter().map(Method::as_str)),
            allowed_headers: ["content-type", "authorization", "x-request-id"]
                .into_iter()
                .map(ToString::to_string)
                .collect(),
            expose_headers: BTreeSet::new(),
            allow_credentials: false,
            max_age: Some(Duration::from_secs(86400)),
        }
    }
}

/// Builds the policy template that routes are restricted from.
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    config: CorsConfig,
}

impl CorsBuilder {
    /// Any origin, common request headers, one day of preflight caching.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts every origin.
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.config.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin. The first call replaces the wildcard.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let AllowedOrigins::List(origins) = &mut self.config.allowed_origins {
            origins.insert(origin.into());
        } else {
            self.config.allowed_origins = AllowedOrigins::List(BTreeSet::from([origin.into()]));
        }
        self
    }

    /// Sets the allowed origins. A `*` entry allows any origin.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: BTreeSet<String> = origins.into_iter().map(Into::into).collect();
        self.config.allowed_origins = if origins.contains("*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        };
        self
    }

    /// Sets the methods offered in preflight responses.
    #[must_use]
    pub fn allow_methods(mut self, methods: AllowedMethods) -> Self {
        self.config.allowed_methods = methods;
        self
    }

    /// Sets the allowed request headers. `*` allows any header.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_headers = headers.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Response headers scripts may read.
    #[must_use]
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.expose_headers = headers.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Whether cookies and authorization may accompany requests.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = allow;
        self
    }

    /// How long browsers may cache a preflight answer.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.config.max_age = Some(duration);
        self
    }

    /// Disables preflight caching.
    #[must_use]
    pub fn no_max_age(mut self) -> Self {
        self.config.max_age = None;
        self
    }

    /// Finishes the policy.
    #[must_use]
    pub fn build(self) -> CorsMiddleware {
        CorsMiddleware {
            config: self.config,
        }
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        CorsBuilder::new().build()
    }
}

impl CorsMiddleware {
    /// Starts a [`CorsBuilder`].
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Returns a copy whose method set is a path's declared methods.
    #[must_use]
    pub fn restricted_to(&self, allowed: &AllowedMethods) -> Self {
        let mut config = self.config.clone();
        config.allowed_methods = allowed.clone();
        Self { config }
    }

    /// Returns the methods this policy offers.
    #[must_use]
    pub fn allowed_methods(&self) -> &AllowedMethods {
        &self.config.allowed_methods
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(headers::ORIGIN)
            && request.headers().contains_key(headers::REQUEST_METHOD)
    }

    fn origin(request: &Request) -> Option<&str> {
        request
            .headers()
            .get(headers::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    fn handle_preflight(&self, request: &Request) -> Response {
        let Some(origin) = Self::origin(request) else {
            return Self::forbidden("Missing Origin header");
        };

        if !self.config.allowed_origins.is_allowed(origin) {
            return Self::forbidden("Origin not allowed");
        }

        let requested = request
            .headers()
            .get(headers::REQUEST_METHOD)
            .and_then(|v| v.to_str().ok())
            .and_then(|m| m.trim().to_ascii_uppercase().parse::<Method>().ok());
        match requested {
            Some(method) if self.config.allowed_methods.contains(&method) => {}
            _ => {
                debug!(
                    origin,
                    allowed = %self.config.allowed_methods.header_value(),
                    "preflight method refused"
                );
                return Self::forbidden("Method not allowed");
            }
        }

        let requested_headers = request
            .headers()
            .get(headers::REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let any_header = self.config.allowed_headers.contains("*");
        if !any_header {
            for header in requested_headers
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
            {
                if !self.config.allowed_headers.contains(&header) {
                    return Self::forbidden(&format!("Header '{header}' not allowed"));
                }
            }
        }

        self.preflight_response(origin, any_header.then_some(requested_headers))
    }

    fn preflight_response(&self, origin: &str, echoed_headers: Option<&str>) -> Response {
        let mut response = Response::no_content();
        let headers = response.headers_mut();

        if let Some(value) = self
            .config
            .allowed_origins
            .header_value(origin, self.config.allow_credentials)
        {
            headers.insert(headers::ALLOW_ORIGIN, value);
        }

        if let Ok(value) = HeaderValue::from_str(&self.config.allowed_methods.header_value()) {
            headers.insert(headers::ALLOW_METHODS, value);
        }

        let allow_headers = match echoed_headers {
            Some(requested) if !requested.is_empty() => requested.to_string(),
            _ => join(&self.config.allowed_headers),
        };
        if !allow_headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&allow_headers) {
                headers.insert(headers::ALLOW_HEADERS, value);
            }
        }

        if self.config.allow_credentials {
            headers.insert(headers::ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }

        if let Some(max_age) = self.config.max_age {
            headers.insert(headers::MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }

        headers.insert(
            headers::VARY,
            HeaderValue::from_static("Origin, Access-Control-Request-Method, Access-Control-Request-Headers"),
        );

        response
    }

    fn forbidden(message: &str) -> Response {
        Response::error(StatusCode::FORBIDDEN, message)
    }

    fn add_cors_headers(&self, response: &mut Response, origin: &str) {
        let headers = response.headers_mut();

        if let Some(value) = self
            .config
            .allowed_origins
            .header_value(origin, self.config.allow_credentials)
        {
            headers.insert(headers::ALLOW_ORIGIN, value);
        }

        if self.config.allow_credentials {
            headers.insert(headers::ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }

        if !self.config.expose_headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&join(&self.config.expose_headers)) {
                headers.insert(headers::EXPOSE_HEADERS, value);
            }
        }

        headers.append(headers::VARY, HeaderValue::from_static("Origin"));
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if Self::is_preflight(&request) {
                return self.handle_preflight(&request);
            }

            let origin = Self::origin(&request).map(String::from);
            let mut response = next.run(ctx, request).await;

            if let Some(origin) = origin {
                if self.config.allowed_origins.is_allowed(&origin) {
                    self.add_cors_headers(&mut response, &origin);
                }
            }

            response
        })
    }
}
