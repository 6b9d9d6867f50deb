//! Path template compilation.
//!
//! Specification templates use brace placeholders (`/pets/{petId}`). A
//! template may carry a `?suffix` that distinguishes sibling entries sharing
//! one path (`/widgets?v=a`, `/widgets?v=b`); the suffix takes no part in
//! matching.
//!
//! Matching is done on the canonical form of a path: no query suffix and
//! exactly one trailing slash. `/a/{id}` and `/a/{id}/` therefore behave
//! identically.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::{ContractError, ContractResult};

/// A compiled specification path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    canonical: String,
    regex: Regex,
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles a template.
    ///
    /// Placeholders may sit anywhere inside a segment (`/files/{name}.{ext}`)
    /// and capture one or more non-slash characters.
    pub fn compile(template: &str) -> ContractResult<Self> {
        let invalid = |reason: &str| ContractError::InvalidPattern {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let path = strip_suffix(template);
        let path = path.trim_end_matches('/');

        let mut pattern = String::from("^");
        let mut canonical = String::new();
        let mut param_names = Vec::new();

        if !path.is_empty() && !path.starts_with('/') {
            pattern.push('/');
            canonical.push('/');
        }

        let mut rest = path;
        while let Some(open) = rest.find(['{', '}']) {
            let (literal, tail) = rest.split_at(open);
            if tail.starts_with('}') {
                return Err(invalid("unbalanced '}'"));
            }
            pattern.push_str(&regex::escape(literal));
            canonical.push_str(literal);

            let close = tail.find('}').ok_or_else(|| invalid("unterminated '{'"))?;
            let name = &tail[1..close];
            if name.is_empty() || name.contains(['{', '/']) {
                return Err(invalid("placeholder names must be non-empty and slash-free"));
            }

            pattern.push_str("([^/]+)");
            canonical.push(':');
            canonical.push_str(name);
            param_names.push(name.to_string());
            rest = &tail[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        canonical.push_str(rest);

        pattern.push_str("/$");
        canonical.push('/');

        let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            canonical,
            regex,
            param_names,
        })
    }

    /// Returns the template as written in the specification.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the comparison form, e.g. `/pets/:petId/`.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Returns placeholder names in template order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Maps a request path to canonical form: query stripped, a single
    /// trailing slash.
    #[must_use]
    pub fn canonicalize(path: &str) -> String {
        let path = strip_suffix(path).trim_end_matches('/');
        let mut out = String::with_capacity(path.len() + 2);
        if !path.is_empty() && !path.starts_with('/') {
            out.push('/');
        }
        out.push_str(path);
        out.push('/');
        out
    }

    /// Returns `true` if the path matches this template.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(&Self::canonicalize(path))
    }

    /// Captures placeholder values from a matching path.
    ///
    /// Values are percent-decoded; one that does not decode to UTF-8 is
    /// returned as written.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let canonical = Self::canonicalize(path);
        let caps = self.regex.captures(&canonical)?;
        Some(
            self.param_names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| m.map(|m| (name.clone(), decode_segment(m.as_str()))))
                .collect(),
        )
    }
}

/// Normalizes a template for equality checks between rule targets and
/// specification entries.
///
/// Unlike [`PathPattern::canonicalize`] the `?suffix` is kept, so sibling
/// templates stay distinct. Placeholders are rewritten to `:name`.
///
/// ```rust
/// use cerberus_contract::pattern::normalize_template;
///
/// assert_eq!(normalize_template("/widgets?v=a"), normalize_template("/widgets/?v=a"));
/// assert_ne!(normalize_template("/widgets?v=a"), normalize_template("/widgets?v=b"));
/// assert_eq!(normalize_template("/pets/{id}"), "/pets/:id/");
/// ```
#[must_use]
pub fn normalize_template(template: &str) -> String {
    let (path, suffix) = match template.split_once('?') {
        Some((path, suffix)) => (path, Some(suffix)),
        None => (template, None),
    };

    let path = path.trim_end_matches('/');
    let mut out = String::with_capacity(template.len() + 2);
    if !path.is_empty() && !path.starts_with('/') {
        out.push('/');
    }
    for c in path.chars() {
        match c {
            '{' => out.push(':'),
            '}' => {}
            other => out.push(other),
        }
    }
    out.push('/');

    if let Some(suffix) = suffix {
        out.push('?');
        out.push_str(suffix);
    }
    out
}

/// Percent-decodes one path segment, keeping the raw text if the bytes are
/// not UTF-8.
#[must_use]
pub fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map_or_else(|_| raw.to_string(), Cow::into_owned)
}

fn strip_suffix(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compile_simple() {
        let pattern = PathPattern::compile("/pets").unwrap();
        assert_eq!(pattern.canonical(), "/pets/");
        assert!(pattern.matches("/pets"));
        assert!(pattern.matches("/pets/"));
        assert!(!pattern.matches("/pets/1"));
    }

    #[test]
    fn test_compile_placeholder() {
        let pattern = PathPattern::compile("/items/{id}").unwrap();
        assert_eq!(pattern.canonical(), "/items/:id/");
        assert_eq!(pattern.param_names(), ["id".to_string()]);

        assert_eq!(
            pattern.captures("/items/42"),
            Some(vec![("id".to_string(), "42".to_string())])
        );
        assert_eq!(pattern.captures("/items/42"), pattern.captures("/items/42/"));
        assert!(pattern.captures("/items").is_none());
    }

    #[test]
    fn test_placeholder_inside_segment() {
        let pattern = PathPattern::compile("/files/{name}.{ext}").unwrap();
        let captures = pattern.captures("/files/report.pdf").unwrap();
        assert_eq!(captures[0], ("name".to_string(), "report".to_string()));
        assert_eq!(captures[1], ("ext".to_string(), "pdf".to_string()));
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let pattern = PathPattern::compile("/pets/{name}").unwrap();
        assert_eq!(
            pattern.captures("/pets/big%20dog"),
            Some(vec![("name".to_string(), "big dog".to_string())])
        );
        // invalid UTF-8 stays as written
        assert_eq!(decode_segment("%FF"), "%FF");
        assert_eq!(decode_segment("a+b"), "a+b");
    }

    #[test]
    fn test_literal_is_escaped() {
        let pattern = PathPattern::compile("/v1.0/pets").unwrap();
        assert!(pattern.matches("/v1.0/pets"));
        assert!(!pattern.matches("/v1x0/pets"));
    }

    #[test]
    fn test_query_suffix_ignored_for_matching() {
        let pattern = PathPattern::compile("/widgets?v=a").unwrap();
        assert_eq!(pattern.canonical(), "/widgets/");
        assert!(pattern.matches("/widgets"));
        assert!(pattern.matches("/widgets?color=red"));
    }

    #[test]
    fn test_root_template() {
        let pattern = PathPattern::compile("/").unwrap();
        assert_eq!(pattern.canonical(), "/");
        assert!(pattern.matches("/"));
        assert!(pattern.matches(""));
        assert!(!pattern.matches("/pets"));
    }

    #[test]
    fn test_host_template_matches_spec_template() {
        // Registration passes host templates through the same matcher.
        let pattern = PathPattern::compile("/pets/{petId}").unwrap();
        assert!(pattern.matches("/pets/:id"));
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            PathPattern::compile("/pets/{id"),
            Err(ContractError::InvalidPattern { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/pets/id}"),
            Err(ContractError::InvalidPattern { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/pets/{}"),
            Err(ContractError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(PathPattern::canonicalize("/pets"), "/pets/");
        assert_eq!(PathPattern::canonicalize("/pets///"), "/pets/");
        assert_eq!(PathPattern::canonicalize("/pets?limit=5"), "/pets/");
        assert_eq!(PathPattern::canonicalize("pets"), "/pets/");
    }

    #[test]
    fn test_normalize_template() {
        assert_eq!(normalize_template("/widgets/"), "/widgets/");
        assert_eq!(normalize_template("/widgets?v=a"), "/widgets/?v=a");
        assert_eq!(normalize_template("/w/{id}/?v=b"), "/w/:id/?v=b");
    }

    proptest! {
        #[test]
        fn prop_trailing_slashes_do_not_change_match(
            segments in proptest::collection::vec("[a-z0-9]{1,8}", 1..5),
            slashes in 0usize..4,
        ) {
            let template = format!("/{}/{{id}}", segments.join("/"));
            let pattern = PathPattern::compile(&template).unwrap();

            let path = format!("/{}/42", segments.join("/"));
            let padded = format!("{path}{}", "/".repeat(slashes));

            prop_assert!(pattern.matches(&path));
            prop_assert_eq!(pattern.captures(&path), pattern.captures(&padded));
        }

        #[test]
        fn prop_canonicalize_is_idempotent(path in "(/[a-z]{0,5}){0,4}/{0,3}") {
            let once = PathPattern::canonicalize(&path);
            prop_assert_eq!(PathPattern::canonicalize(&once), once.clone());
            prop_assert!(once.ends_with('/'));
            prop_assert!(!once.ends_with("//"));
        }
    }
}
