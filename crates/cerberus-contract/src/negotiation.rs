//! Declared-method sets used for CORS and 405 responses.

use http::Method;

/// Methods in the order they are advertised.
const CANONICAL_ORDER: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Methods that receive a generated 405 chain when a path does not declare
/// them. `OPTIONS` is answered by the preflight chain instead.
pub const DEFAULT_DENY_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::HEAD,
    Method::DELETE,
    Method::PATCH,
];

/// The set of HTTP methods a specification path declares.
///
/// The wildcard `all` key is never part of the set.
///
/// ```rust
/// use cerberus_contract::AllowedMethods;
///
/// let allowed = AllowedMethods::from_keys(["post", "get", "all"]);
/// assert_eq!(allowed.header_value(), "GET,POST");
/// assert_eq!(allowed.display_list(), "GET, POST");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<Method>,
}

impl AllowedMethods {
    /// Builds the set from lower- or mixed-case method keys.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let declared: Vec<String> = keys
            .into_iter()
            .map(|k| k.as_ref().to_ascii_uppercase())
            .collect();
        let methods = CANONICAL_ORDER
            .iter()
            .filter(|m| declared.iter().any(|d| d == m.as_str()))
            .cloned()
            .collect();
        Self { methods }
    }

    /// Returns the methods in canonical order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Returns `true` if the method is declared.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Returns `true` when nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Value for `Allow` and `Access-Control-Allow-Methods` headers.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.join(",")
    }

    /// Human readable list used in 405 bodies.
    #[must_use]
    pub fn display_list(&self) -> String {
        self.join(", ")
    }

    /// Returns the default-deny methods this set does not declare.
    #[must_use]
    pub fn denied(&self) -> Vec<Method> {
        DEFAULT_DENY_METHODS
            .iter()
            .filter(|m| !self.contains(m))
            .cloned()
            .collect()
    }

    fn join(&self, separator: &str) -> String {
        self.methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_and_wildcard_exclusion() {
        let allowed = AllowedMethods::from_keys(["delete", "all", "get", "patch"]);
        assert_eq!(
            allowed.methods(),
            [Method::GET, Method::DELETE, Method::PATCH]
        );
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let allowed = AllowedMethods::from_keys(["get", "parameters", "x-extension"]);
        assert_eq!(allowed.methods(), [Method::GET]);
    }

    #[test]
    fn test_header_and_display() {
        let allowed = AllowedMethods::from_keys(["GET", "Post"]);
        assert_eq!(allowed.header_value(), "GET,POST");
        assert_eq!(allowed.display_list(), "GET, POST");
        assert!(allowed.contains(&Method::POST));
        assert!(!allowed.contains(&Method::PUT));
    }

    #[test]
    fn test_denied_excludes_options() {
        let allowed = AllowedMethods::from_keys(["get", "post"]);
        assert_eq!(
            allowed.denied(),
            vec![Method::PUT, Method::HEAD, Method::DELETE, Method::PATCH]
        );
    }

    #[test]
    fn test_empty() {
        let allowed = AllowedMethods::from_keys(Vec::<String>::new());
        assert!(allowed.is_empty());
        assert_eq!(allowed.header_value(), "");
    }
}
