//! Common types used throughout handler chains.

use bytes::Bytes;
use cerberus_core::CerberusError;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// The HTTP request type used in handler chains.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in handler chains.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses.
pub trait ResponseExt {
    /// Creates a plain-text response with the given status code.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Renders a [`CerberusError`] as its JSON envelope.
    fn envelope(error: &CerberusError, request_id: Option<&str>) -> Response;

    /// Creates an empty `204 No Content` response.
    fn no_content() -> Response;
}

impl ResponseExt for Response {
    fn error(status: StatusCode, message: &str) -> Response {
        with_body(
            status,
            "text/plain; charset=utf-8",
            Bytes::from(message.to_string()),
        )
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        with_body(status, "application/json", Bytes::from(body.to_string()))
    }

    fn envelope(error: &CerberusError, request_id: Option<&str>) -> Response {
        let envelope = error.to_envelope(request_id);
        match serde_json::to_vec(&envelope) {
            Ok(body) => with_body(error.status_code(), "application/json", Bytes::from(body)),
            Err(_) => Self::json_error(error.status_code(), error.error_code(), &error.to_string()),
        }
    }

    fn no_content() -> Response {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NO_CONTENT;
        response
    }
}

fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerberus_core::FieldErrors;
    use http_body_util::BodyExt;

    #[test]
    fn test_error_response() {
        let response = Response::error(StatusCode::BAD_REQUEST, "Invalid input");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_json_error_response() {
        let response = Response::json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "no route");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_envelope_response() {
        let fields: FieldErrors = [("body/name", "\"name\" is a required property")]
            .into_iter()
            .collect();
        let error = CerberusError::validation_with_fields("request validation failed", fields);

        let response = Response::envelope(&error, Some("req-1"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["request_id"], "req-1");
        assert!(json["error"]["details"]["fields"]["body/name"].is_array());
    }

    #[test]
    fn test_no_content() {
        let response = Response::no_content();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().is_empty());
    }
}
