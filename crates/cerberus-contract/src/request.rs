//! Request view consumed by rule selection and validation.

use std::collections::HashMap;

use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Parsed request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body, or only whitespace.
    #[default]
    Empty,
    /// A well-formed JSON document.
    Json(Value),
    /// Bytes that failed to parse; holds the parser message.
    Invalid(String),
}

impl RequestBody {
    /// Parses raw body bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(e) => Self::Invalid(e.to_string()),
        }
    }

    /// Returns the JSON value, if the body parsed.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// The parts of an HTTP request the contract looks at.
///
/// Query values are percent-decoded and multi-valued; header lookups are
/// case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    /// Request method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Query parameters, in order of first appearance.
    pub query: IndexMap<String, Vec<String>>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Path captures from the host router.
    pub params: HashMap<String, String>,
    /// Parsed body.
    pub body: RequestBody,
}

impl RequestParts {
    /// Creates a request view for a method and path. A `?query` suffix on
    /// `path` is split off and parsed.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (path, IndexMap::new()),
        };
        Self {
            method,
            path,
            query,
            ..Self::default()
        }
    }

    /// Builds a view from `http` request parts and the collected body.
    #[must_use]
    pub fn from_http(parts: &http::request::Parts, body: &[u8]) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(parse_query).unwrap_or_default(),
            headers: parts.headers.clone(),
            params: HashMap::new(),
            body: RequestBody::from_bytes(body),
        }
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = parse_query(query);
        self
    }

    /// Adds a header. Invalid names or values are skipped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Adds a host path capture.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Sets the body from raw bytes.
    #[must_use]
    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = RequestBody::from_bytes(body);
        self
    }

    /// Returns the first value of a header, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).ok()?;
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value of a header, case-insensitively.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<String> {
        let Ok(name) = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()) else {
            return Vec::new();
        };
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    /// Renders a request section as JSON for dotted-path lookups.
    ///
    /// Recognized sections are `query`, `header`/`headers`, `path`/`params`
    /// and `body`. Single-valued query keys render as strings.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<Value> {
        match name {
            "query" => Some(Value::Object(
                self.query
                    .iter()
                    .map(|(k, values)| {
                        let value = match values.as_slice() {
                            [single] => Value::String(single.clone()),
                            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
                        };
                        (k.clone(), value)
                    })
                    .collect(),
            )),
            "header" | "headers" => {
                let mut map = Map::new();
                for (name, value) in &self.headers {
                    if let Ok(value) = value.to_str() {
                        map.entry(name.as_str().to_string())
                            .or_insert_with(|| Value::String(value.to_string()));
                    }
                }
                Some(Value::Object(map))
            }
            "path" | "params" => Some(Value::Object(
                self.params
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )),
            "body" => self.body.json().cloned(),
            _ => None,
        }
    }
}

/// Parses a query string into ordered, multi-valued pairs.
///
/// Malformed input yields an empty map.
#[must_use]
pub fn parse_query(query: &str) -> IndexMap<String, Vec<String>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in pairs {
        map.entry(key).or_default().push(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_multi_valued() {
        let query = parse_query("tag=a&limit=5&tag=b&name=hello%20world");
        assert_eq!(query.get("tag").unwrap(), &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(query.get("limit").unwrap(), &vec!["5".to_string()]);
        assert_eq!(query.get("name").unwrap(), &vec!["hello world".to_string()]);
        assert_eq!(query.keys().collect::<Vec<_>>(), vec!["tag", "limit", "name"]);
    }

    #[test]
    fn test_new_splits_query() {
        let parts = RequestParts::new(Method::GET, "/pets?limit=5");
        assert_eq!(parts.path, "/pets");
        assert_eq!(parts.query.get("limit").unwrap()[0], "5");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let parts = RequestParts::new(Method::GET, "/widgets").with_header("X-Variant", "legacy");
        assert_eq!(parts.header("x-variant"), Some("legacy"));
        assert_eq!(parts.header("X-VARIANT"), Some("legacy"));
        assert_eq!(parts.header("x-missing"), None);
    }

    #[test]
    fn test_body_parsing() {
        assert_eq!(RequestBody::from_bytes(b""), RequestBody::Empty);
        assert_eq!(RequestBody::from_bytes(b"  \n"), RequestBody::Empty);
        assert_eq!(
            RequestBody::from_bytes(br#"{"name":"rex"}"#),
            RequestBody::Json(json!({"name": "rex"}))
        );
        assert!(matches!(RequestBody::from_bytes(b"{oops"), RequestBody::Invalid(_)));
    }

    #[test]
    fn test_from_http() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/pets?dry_run=true")
            .header("content-type", "application/json")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let view = RequestParts::from_http(&parts, br#"{"name":"rex"}"#);
        assert_eq!(view.method, Method::POST);
        assert_eq!(view.path, "/pets");
        assert_eq!(view.query.get("dry_run").unwrap()[0], "true");
        assert_eq!(view.body.json(), Some(&json!({"name": "rex"})));
    }

    #[test]
    fn test_sections() {
        let parts = RequestParts::new(Method::GET, "/pets/7?tag=a&tag=b&limit=5")
            .with_header("X-Variant", "legacy")
            .with_param("petId", "7")
            .with_json(json!({"meta": {"kind": "dog"}}));

        assert_eq!(
            parts.section("query"),
            Some(json!({"tag": ["a", "b"], "limit": "5"}))
        );
        assert_eq!(parts.section("headers"), Some(json!({"x-variant": "legacy"})));
        assert_eq!(parts.section("path"), Some(json!({"petId": "7"})));
        assert_eq!(parts.section("body"), Some(json!({"meta": {"kind": "dog"}})));
        assert_eq!(parts.section("cookies"), None);
    }
}
