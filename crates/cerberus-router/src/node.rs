//! Segment tree behind [`Router`](crate::Router).
//!
//! One node per path segment. Static children stay sorted so lookups can
//! binary search them; a node has at most one parameter child and one
//! trailing catch-all child.

use crate::method_router::MethodRouter;
use crate::params::Params;

/// How a node matches its segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text, such as `pets`.
    Static,
    /// One segment captured under a name, written `{id}` or `:id`.
    Param(String),
    /// The rest of the path captured under a name, written `*rest`.
    Wildcard(String),
}

/// One segment of the tree.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// Segment as registered.
    pub segment: String,

    /// How the segment matches.
    pub kind: SegmentKind,

    /// Handlers of the path ending here.
    pub methods: Option<MethodRouter<T>>,

    /// Literal children, ordered by segment.
    pub static_children: Vec<Node<T>>,

    /// Capturing child.
    pub param_child: Option<Box<Node<T>>>,

    /// Catch-all child; always a leaf.
    pub wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// A literal node.
    #[must_use]
    pub fn new_static(segment: impl Into<String>) -> Self {
        Self::with_kind(segment.into(), SegmentKind::Static)
    }

    /// A node capturing one segment as `name`.
    #[must_use]
    pub fn new_param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_kind(format!("{{{name}}}"), SegmentKind::Param(name))
    }

    /// A node capturing the remaining path as `name`.
    #[must_use]
    pub fn new_wildcard(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_kind(format!("*{name}"), SegmentKind::Wildcard(name))
    }

    /// The empty root.
    #[must_use]
    pub fn root() -> Self {
        Self::new_static("")
    }

    /// Merges `methods` into whatever `path` already has.
    pub fn insert(&mut self, path: &str, methods: MethodRouter<T>) {
        self.entry(path).0.merge(methods);
    }

    /// The handlers slot for `path`, created on first use.
    ///
    /// The flag is `true` when this call created the slot. Empty segments
    /// are ignored, so `/pets/` and `/pets` share a slot.
    pub fn entry(&mut self, path: &str) -> (&mut MethodRouter<T>, bool) {
        let segments = Self::parse_path(path);
        self.entry_segments(&segments)
    }

    /// Splits a route into classified segments.
    ///
    /// `*name` only captures in last position; elsewhere it is literal text.
    fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
        let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let last = raw.len().saturating_sub(1);
        raw.iter()
            .enumerate()
            .map(|(i, s)| {
                let kind = if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    SegmentKind::Param(name.to_string())
                } else if let Some(name) = s.strip_prefix(':') {
                    SegmentKind::Param(name.to_string())
                } else if let Some(name) = s.strip_prefix('*').filter(|_| i == last) {
                    SegmentKind::Wildcard(name.to_string())
                } else {
                    SegmentKind::Static
                };
                ((*s).to_string(), kind)
            })
            .collect()
    }

    fn entry_segments(&mut self, segments: &[(String, SegmentKind)]) -> (&mut MethodRouter<T>, bool) {
        let Some(((segment, kind), rest)) = segments.split_first() else {
            let created = self.methods.is_none();
            return (self.methods.get_or_insert_with(MethodRouter::new), created);
        };

        let child = match kind {
            SegmentKind::Static => {
                let at = match self.static_position(segment) {
                    Ok(at) => at,
                    Err(at) => {
                        self.static_children.insert(at, Node::new_static(segment.clone()));
                        at
                    }
                };
                &mut self.static_children[at]
            }
            // The first registered name wins for a shared parameter position.
            SegmentKind::Param(name) => self
                .param_child
                .get_or_insert_with(|| Box::new(Node::new_param(name.clone())))
                .as_mut(),
            SegmentKind::Wildcard(name) => self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Node::new_wildcard(name.clone())))
                .as_mut(),
        };
        child.entry_segments(rest)
    }

    /// Finds the handlers for `path` and the values its parameters captured.
    ///
    /// Literal children are tried before parameters, parameters before the
    /// catch-all.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let methods = self.match_segments(&segments, &mut params)?;
        Some((methods, params))
    }

    fn match_segments<'a>(&'a self, segments: &[&str], params: &mut Params) -> Option<&'a MethodRouter<T>> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        if let Ok(at) = self.static_position(segment) {
            if let Some(found) = self.static_children[at].match_segments(rest, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), (*segment).to_string());
                if let Some(found) = child.match_segments(rest, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        let child = self.wildcard_child.as_ref()?;
        let SegmentKind::Wildcard(name) = &child.kind else {
            return None;
        };
        params.push(name.clone(), segments.join("/"));
        child.methods.as_ref()
    }

    fn static_position(&self, segment: &str) -> Result<usize, usize> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_segments_are_classified() {
        let segments = Node::<()>::parse_path("/pets/{petId}/:tag/*rest");
        let kinds: Vec<_> = segments.into_iter().map(|(_, kind)| kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Static,
                SegmentKind::Param("petId".to_string()),
                SegmentKind::Param("tag".to_string()),
                SegmentKind::Wildcard("rest".to_string()),
            ]
        );
    }

    #[test]
    fn test_star_before_last_segment_is_literal() {
        let mut root = Node::root();
        root.insert("/files/*path/meta", MethodRouter::new().get("meta"));

        let (methods, params) = root.match_path("/files/*path/meta").unwrap();
        assert_eq!(methods.handler(&Method::GET), Some(&"meta"));
        assert!(params.is_empty());
        assert!(root.match_path("/files/a/meta").is_none());
    }

    #[test]
    fn test_braced_placeholder_captures() {
        let mut root = Node::root();
        root.insert("/owners/{ownerId}/pets", MethodRouter::new().get("ownerPets"));

        let (methods, params) = root.match_path("/owners/42/pets").unwrap();
        assert_eq!(methods.handler(&Method::GET), Some(&"ownerPets"));
        assert_eq!(params.get("ownerId"), Some("42"));
    }

    #[test]
    fn test_entry_reports_creation_once() {
        let mut root: Node<&str> = Node::root();
        assert!(root.entry("/pets").1);

        let (methods, created) = root.entry("/pets/");
        assert!(!created);
        methods.set(&Method::GET, "listPets");

        let (methods, _) = root.match_path("/pets").unwrap();
        assert_eq!(methods.explicit(&Method::GET), Some(&"listPets"));
    }

    #[test]
    fn test_literal_beats_placeholder() {
        let mut root = Node::root();
        root.insert("/pets/{petId}", MethodRouter::new().get("getPet"));
        root.insert("/pets/search", MethodRouter::new().get("searchPets"));

        let (methods, params) = root.match_path("/pets/search").unwrap();
        assert_eq!(methods.handler(&Method::GET), Some(&"searchPets"));
        assert!(params.is_empty());

        let (methods, params) = root.match_path("/pets/9").unwrap();
        assert_eq!(methods.handler(&Method::GET), Some(&"getPet"));
        assert_eq!(params.get("petId"), Some("9"));
    }

    #[test]
    fn test_backtracking_drops_stale_capture() {
        let mut root = Node::root();
        root.insert("/a/{x}/b", MethodRouter::new().get("deep"));
        root.insert("/a/*rest", MethodRouter::new().get("catchAll"));

        let (methods, params) = root.match_path("/a/1/c").unwrap();
        assert_eq!(methods.handler(&Method::GET), Some(&"catchAll"));
        assert_eq!(params.get("x"), None);
        assert_eq!(params.get("rest"), Some("1/c"));
    }

    #[test]
    fn test_catch_all_takes_remaining_segments() {
        let mut root = Node::root();
        root.insert("/docs/*page", MethodRouter::new().get("docs"));

        let (_, params) = root.match_path("/docs/guide/routing.html").unwrap();
        assert_eq!(params.get("page"), Some("guide/routing.html"));
    }

    #[test]
    fn test_unknown_path() {
        let mut root = Node::root();
        root.insert("/pets", MethodRouter::new().get("listPets"));
        assert!(root.match_path("/owners").is_none());
        assert!(root.match_path("/pets/1").is_none());
    }
}
