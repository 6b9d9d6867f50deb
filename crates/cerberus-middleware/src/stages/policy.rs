//! Terminal handlers for generated method-policy chains.
//!
//! When a specification path is first registered, every default method it
//! does not declare is bound to [`MethodNotAllowed`], and `OPTIONS` is bound
//! to [`Preflight`]. Both sit behind the path's CORS stage.

use crate::middleware::BoxFuture;
use crate::pipeline::Handler;
use crate::types::{Request, Response, ResponseExt};
use cerberus_contract::AllowedMethods;
use http::{header, HeaderValue, StatusCode};
use tracing::debug;

/// Answers every request with `405 Method Not Allowed`.
///
/// The body names the request path, the refused method and the declared
/// methods:
///
/// ```text
/// /pets does not allow DELETE.
/// Allowed methods: GET, POST
/// ```
#[derive(Debug, Clone)]
pub struct MethodNotAllowed {
    allowed: AllowedMethods,
}

impl MethodNotAllowed {
    /// Creates the handler for a path's declared methods.
    #[must_use]
    pub fn new(allowed: AllowedMethods) -> Self {
        Self { allowed }
    }

    /// Renders the response body for a request.
    #[must_use]
    pub fn message(&self, path: &str, method: &str) -> String {
        format!(
            "{path} does not allow {}.\nAllowed methods: {}",
            method.to_ascii_uppercase(),
            self.allowed.display_list()
        )
    }
}

impl Handler for MethodNotAllowed {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let message = self.message(request.uri().path(), request.method().as_str());
        let allow = HeaderValue::from_str(&self.allowed.header_value()).ok();
        debug!(
            method = %request.method(),
            path = %request.uri().path(),
            "method not declared for path"
        );

        Box::pin(async move {
            let mut response = Response::error(StatusCode::METHOD_NOT_ALLOWED, &message);
            if let Some(allow) = allow {
                response.headers_mut().insert(header::ALLOW, allow);
            }
            response
        })
    }
}

/// Answers `OPTIONS` with `204 No Content` and an `Allow` header.
///
/// CORS preflights never reach this handler; the CORS stage answers them.
#[derive(Debug, Clone)]
pub struct Preflight {
    allowed: AllowedMethods,
}

impl Preflight {
    /// Creates the handler for a path's declared methods.
    #[must_use]
    pub fn new(allowed: AllowedMethods) -> Self {
        Self { allowed }
    }
}

impl Handler for Preflight {
    fn call(&self, _request: Request) -> BoxFuture<'static, Response> {
        let allow = HeaderValue::from_str(&self.allowed.header_value()).ok();
        Box::pin(async move {
            let mut response = Response::no_content();
            if let Some(allow) = allow {
                response.headers_mut().insert(header::ALLOW, allow);
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use http_body_util::{BodyExt, Full};

    fn request(method: Method, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_method_not_allowed_body_and_header() {
        let handler = MethodNotAllowed::new(AllowedMethods::from_keys(["post", "get"]));
        let response = handler.call(request(Method::DELETE, "/pets?x=1")).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET,POST");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "/pets does not allow DELETE.\nAllowed methods: GET, POST"
        );
    }

    #[tokio::test]
    async fn test_preflight_without_cors_headers() {
        let handler = Preflight::new(AllowedMethods::from_keys(["get"]));
        let response = handler.call(request(Method::OPTIONS, "/pets")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET");
    }

    #[test]
    fn test_message_uppercases_method() {
        let handler = MethodNotAllowed::new(AllowedMethods::from_keys(["get"]));
        assert_eq!(
            handler.message("/a", "patch"),
            "/a does not allow PATCH.\nAllowed methods: GET"
        );
    }
}
