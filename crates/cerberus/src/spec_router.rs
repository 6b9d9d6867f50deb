//! Specification-bound route registration and dispatch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cerberus_config::{CerberusConfig, CorsSection, SpecFormat};
use cerberus_contract::{
    AllowedMethods, Contract, ContractError, ContractResult, PathPattern,
    SpecDocument, ValidationConfig,
};
use cerberus_core::{CerberusError, RequestId};
use cerberus_middleware::{
    BoxedMiddleware, ContractValidationMiddleware, CorsMiddleware, Handler, HandlerChain,
    MethodNotAllowed, MiddlewareContext, Preflight, Request, Response, ResponseExt,
};
use cerberus_router::Router;
use cerberus_telemetry::{log_request_complete, log_request_rejected};
use http::{header, HeaderValue, Method};
use tracing::{debug, info, warn};

/// Header carrying the request ID in and out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Specification key for wildcard registrations.
const ALL: &str = "all";

/// A router whose routes are bound to a specification.
///
/// Every registration is checked against the specification when it is made.
/// Each registered route gets a chain of CORS policy, contract validation,
/// user layers and the handler. The first registration on a host path also
/// installs `OPTIONS` and `405` chains for it, built from the union of the
/// methods declared by every specification template matching that path.
///
/// # Example
///
/// ```rust,ignore
/// let mut router = SpecRouter::new(contract);
/// router
///     .route("/pets")
///     .get(list_pets)?
///     .post(create_pet)?;
///
/// let response = router.dispatch(request).await;
/// ```
pub struct SpecRouter {
    contract: Arc<Contract>,
    cors: CorsMiddleware,
    router: Router<Arc<HandlerChain>>,
    policy_paths: HashSet<String>,
}

impl SpecRouter {
    /// Creates a router with the default CORS policy.
    #[must_use]
    pub fn new(contract: Contract) -> Self {
        Self::from_shared(Arc::new(contract))
    }

    /// Creates a router over a shared contract.
    #[must_use]
    pub fn from_shared(contract: Arc<Contract>) -> Self {
        Self {
            contract,
            cors: CorsMiddleware::default(),
            router: Router::new(),
            policy_paths: HashSet::new(),
        }
    }

    /// Replaces the CORS policy template.
    ///
    /// Allowed methods in `cors` are ignored: every route is restricted to
    /// the methods its specification path declares. Affects registrations
    /// made after this call.
    #[must_use]
    pub fn with_cors(mut self, cors: CorsMiddleware) -> Self {
        self.cors = cors;
        self
    }

    /// Loads the specification named in `config` and applies its
    /// validation and CORS settings.
    ///
    /// # Errors
    ///
    /// Fails if no specification path is configured, the file cannot be
    /// read or parsed, or the document cannot be indexed.
    pub async fn from_config(config: &CerberusConfig) -> ContractResult<Self> {
        let path = config
            .spec
            .path
            .as_deref()
            .ok_or_else(|| ContractError::Load("no specification path configured".to_string()))?;

        let format = config.spec.resolved_format().ok_or_else(|| {
            ContractError::Load(format!("cannot determine document format of {path}"))
        })?;

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ContractError::Load(format!("{path}: {e}")))?;
        let document = match format {
            SpecFormat::Yaml => SpecDocument::from_yaml(&text)?,
            SpecFormat::Json | SpecFormat::Auto => SpecDocument::from_json(&text)?,
        };

        let contract = Contract::new(document, ValidationConfig::from(&config.validation))?;
        info!(
            spec = path,
            format = format_name(format),
            routes = contract.index().entries().len(),
            "specification loaded"
        );

        Ok(Self::new(contract).with_cors(cors_from_section(&config.cors)))
    }

    /// Returns the contract routes are bound to.
    #[must_use]
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// Returns the number of distinct host paths with at least one chain.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.len()
    }

    /// Returns the chain installed for `(method, path)`, if any.
    #[must_use]
    pub fn chain(&self, method: &Method, path: &str) -> Option<&Arc<HandlerChain>> {
        self.router.match_route(method, path).map(|found| found.handler)
    }

    /// Registers a handler for a specification operation.
    ///
    /// `method` is an HTTP method name or `all`. `path` is the host route
    /// (`/pets/{petId}`); it must match at least one specification template
    /// declaring `method`. A later registration for the same method and
    /// path replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationNotDeclared`] if the specification
    /// does not declare the operation.
    pub fn register_with_policy(
        &mut self,
        method: &str,
        path: &str,
        layers: Vec<BoxedMiddleware>,
        handler: impl Handler,
    ) -> ContractResult<&mut Self> {
        let method_key = method.to_ascii_lowercase();
        let matches = match self.contract.resolve(path, &method_key) {
            Ok(matches) => matches,
            Err(err) => {
                warn!(method = %method_key.to_ascii_uppercase(), path, error = %err, "registration rejected");
                return Err(err);
            }
        };

        for matched in &matches {
            if matched.entry.claim_policy() {
                debug!(template = matched.entry.template(), "first policy registration");
            }
        }
        if self.policy_paths.insert(PathPattern::canonicalize(path)) {
            self.install_policy(path);
        }

        let chain = HandlerChain::builder()
            .policy(self.cors_for(&self.declared_methods(path), self.declares_all_at(path)))
            .validation(ContractValidationMiddleware::new(
                Arc::clone(&self.contract),
                method_key.as_str(),
            ))
            .layers(layers)
            .build(handler);
        let chain = Arc::new(chain);

        let slot = self.router.entry(path);
        if method_key == ALL {
            slot.set_any(chain);
        } else {
            let stored = Method::from_bytes(method_key.to_ascii_uppercase().as_bytes())
                .map(|parsed| slot.set(&parsed, chain))
                .unwrap_or(false);
            if !stored {
                return Err(ContractError::OperationNotDeclared {
                    method: method_key.to_ascii_uppercase(),
                    path: path.to_string(),
                });
            }
        }

        info!(
            method = %method_key.to_ascii_uppercase(),
            path,
            templates = matches.len(),
            "route registered"
        );
        Ok(self)
    }

    /// Registers a `GET` handler without extra layers.
    pub fn get(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy("get", path, Vec::new(), handler)
    }

    /// Registers a `POST` handler without extra layers.
    pub fn post(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy("post", path, Vec::new(), handler)
    }

    /// Registers a `PUT` handler without extra layers.
    pub fn put(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy("put", path, Vec::new(), handler)
    }

    /// Registers a `DELETE` handler without extra layers.
    pub fn delete(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy("delete", path, Vec::new(), handler)
    }

    /// Registers a `PATCH` handler without extra layers.
    pub fn patch(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy("patch", path, Vec::new(), handler)
    }

    /// Registers a `HEAD` handler without extra layers.
    pub fn head(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy("head", path, Vec::new(), handler)
    }

    /// Registers a handler for the specification's `all` operation.
    ///
    /// Explicitly registered and generated chains take precedence.
    pub fn all(&mut self, path: &str, handler: impl Handler) -> ContractResult<&mut Self> {
        self.register_with_policy(ALL, path, Vec::new(), handler)
    }

    /// Starts chained registration for one path.
    pub fn route(&mut self, path: impl Into<String>) -> RouteBuilder<'_> {
        RouteBuilder {
            router: self,
            path: path.into(),
            layers: Vec::new(),
        }
    }

    /// Routes a request to its chain.
    ///
    /// Unknown paths get a 404 envelope. Known paths without a chain for
    /// the method get a 405 envelope listing the declared methods.
    pub async fn dispatch(&self, request: Request) -> Response {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_else(RequestId::new);
        let mut ctx = MiddlewareContext::with_request_id(request_id);
        let id = request_id.to_string();

        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut response = match self.router.match_path(&path) {
            None => {
                debug!(request_id = %id, path = %path, "no route");
                Response::envelope(
                    &CerberusError::not_found(format!("no route for {path}")),
                    Some(&id),
                )
            }
            Some((methods, params)) => match methods.handler(&method) {
                Some(chain) => {
                    ctx.set_path_params(params.to_map());
                    chain.process(&mut ctx, request).await
                }
                None => {
                    let allowed = self.declared_methods(&path);
                    let error = CerberusError::method_not_allowed(
                        method.as_str(),
                        path.as_str(),
                        allowed.methods().iter().map(Method::as_str),
                    );
                    let mut response = Response::envelope(&error, Some(&id));
                    if let Ok(value) = HeaderValue::from_str(&allowed.header_value()) {
                        response.headers_mut().insert(header::ALLOW, value);
                    }
                    response
                }
            },
        };

        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        let status = response.status();
        let duration_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);
        if status.is_client_error() || status.is_server_error() {
            log_request_rejected!(id, method, path, status.as_u16(), duration_ms);
        } else {
            log_request_complete!(id, method, path, status.as_u16(), duration_ms);
        }

        response
    }

    /// Installs the `OPTIONS` chain and the `405` chains for a host path.
    ///
    /// The allowed set is every method declared by any template matching the
    /// path, so sibling templates share one policy. Chains already present
    /// are kept.
    fn install_policy(&mut self, path: &str) {
        let allowed = self.declared_methods(path);
        let wildcard = self.declares_all_at(path);
        let cors = self.cors_for(&allowed, wildcard);

        let methods = self.router.entry(path);
        methods.set_if_absent(
            &Method::OPTIONS,
            Arc::new(
                HandlerChain::builder()
                    .policy(cors.clone())
                    .build(Preflight::new(allowed.clone())),
            ),
        );

        if wildcard {
            debug!(path, "wildcard path, no 405 chains");
            return;
        }

        let denied = allowed.denied();
        for method in &denied {
            methods.set_if_absent(
                method,
                Arc::new(
                    HandlerChain::builder()
                        .policy(cors.clone())
                        .build(MethodNotAllowed::new(allowed.clone())),
                ),
            );
        }

        debug!(
            path,
            allowed = %allowed.header_value(),
            denied = denied.len(),
            "method policy installed"
        );
    }

    /// Methods declared by any specification template matching `path`.
    fn declared_methods(&self, path: &str) -> AllowedMethods {
        AllowedMethods::from_keys(
            self.contract
                .index()
                .entries()
                .iter()
                .filter(|entry| entry.pattern().matches(path))
                .flat_map(|entry| entry.method_keys()),
        )
    }

    fn declares_all_at(&self, path: &str) -> bool {
        self.contract
            .index()
            .entries()
            .iter()
            .any(|entry| entry.pattern().matches(path) && entry.declares(ALL))
    }

    fn cors_for(&self, allowed: &AllowedMethods, wildcard: bool) -> CorsMiddleware {
        if wildcard {
            self.cors.clone()
        } else {
            self.cors.restricted_to(allowed)
        }
    }
}

impl std::fmt::Debug for SpecRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecRouter")
            .field("contract", &self.contract)
            .field("cors", &self.cors)
            .field("routes", &self.router.len())
            .finish()
    }
}

/// Chained registration for one path.
///
/// ```rust,ignore
/// router
///     .route("/pets/{petId}")
///     .layer(audit)
///     .get(get_pet)?
///     .delete(delete_pet)?;
/// ```
pub struct RouteBuilder<'r> {
    router: &'r mut SpecRouter,
    path: String,
    layers: Vec<BoxedMiddleware>,
}

impl RouteBuilder<'_> {
    /// Adds a user layer to every subsequent registration on this path.
    #[must_use]
    pub fn layer(mut self, middleware: BoxedMiddleware) -> Self {
        self.layers.push(middleware);
        self
    }

    /// Registers a handler for `method`.
    ///
    /// # Errors
    ///
    /// Fails if the specification does not declare the operation.
    pub fn on(self, method: &str, handler: impl Handler) -> ContractResult<Self> {
        self.router
            .register_with_policy(method, &self.path, self.layers.clone(), handler)?;
        Ok(self)
    }

    /// Registers a `GET` handler.
    pub fn get(self, handler: impl Handler) -> ContractResult<Self> {
        self.on("get", handler)
    }

    /// Registers a `POST` handler.
    pub fn post(self, handler: impl Handler) -> ContractResult<Self> {
        self.on("post", handler)
    }

    /// Registers a `PUT` handler.
    pub fn put(self, handler: impl Handler) -> ContractResult<Self> {
        self.on("put", handler)
    }

    /// Registers a `DELETE` handler.
    pub fn delete(self, handler: impl Handler) -> ContractResult<Self> {
        self.on("delete", handler)
    }

    /// Registers a `PATCH` handler.
    pub fn patch(self, handler: impl Handler) -> ContractResult<Self> {
        self.on("patch", handler)
    }

    /// Registers a `HEAD` handler.
    pub fn head(self, handler: impl Handler) -> ContractResult<Self> {
        self.on("head", handler)
    }

    /// Registers an `all` handler.
    pub fn all(self, handler: impl Handler) -> ContractResult<Self> {
        self.on(ALL, handler)
    }
}

fn format_name(format: SpecFormat) -> &'static str {
    match format {
        SpecFormat::Auto => "auto",
        SpecFormat::Json => "json",
        SpecFormat::Yaml => "yaml",
    }
}

/// Builds the CORS policy template from configuration.
#[must_use]
pub fn cors_from_section(section: &CorsSection) -> CorsMiddleware {
    let mut builder = CorsMiddleware::builder()
        .allow_origins(section.allowed_origins.iter().map(String::as_str))
        .allow_headers(section.allowed_headers.iter().map(String::as_str))
        .expose_headers(section.expose_headers.iter().map(String::as_str))
        .allow_credentials(section.allow_credentials);
    builder = match section.max_age_secs {
        Some(secs) => builder.max_age(Duration::from_secs(secs)),
        None => builder.no_max_age(),
    };
    builder.build()
}
