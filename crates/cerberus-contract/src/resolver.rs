//! Operation resolution.
//!
//! Maps a request path and method to every specification entry that
//! declares them. Unlike a host router, resolution does not stop at the
//! first hit: sibling templates (`/widgets?v=a`, `/widgets?v=b`) all match,
//! and the rule table picks one later.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ContractError, ContractResult};
use crate::index::{Operation, RouteEntry, SpecIndex};

/// One entry that matched a request.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The matching specification entry.
    pub entry: Arc<RouteEntry>,
    /// The resolved operation for the requested method.
    pub operation: Arc<Operation>,
    /// Path parameters captured by the entry's pattern.
    pub params: HashMap<String, String>,
}

/// Resolves requests to specification operations.
#[derive(Debug, Clone)]
pub struct OperationResolver {
    index: Arc<SpecIndex>,
}

impl OperationResolver {
    /// Create a resolver over an index.
    #[must_use]
    pub fn new(index: Arc<SpecIndex>) -> Self {
        Self { index }
    }

    /// Returns the underlying index.
    #[must_use]
    pub fn index(&self) -> &Arc<SpecIndex> {
        &self.index
    }

    /// Returns every entry that matches `path` and declares `method`.
    ///
    /// The method is matched case-insensitively and a trailing slash on the
    /// path is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationNotDeclared`] when nothing matches,
    /// or a reference error if a matching operation cannot be resolved.
    pub fn resolve(&self, path: &str, method: &str) -> ContractResult<Vec<MatchResult>> {
        let method = method.to_ascii_lowercase();
        let mut matches = Vec::new();

        for entry in self.index.entries() {
            if !entry.declares(&method) {
                continue;
            }
            let Some(captures) = entry.pattern().captures(path) else {
                continue;
            };
            let Some(operation) = self.index.operation(entry, &method)? else {
                continue;
            };
            matches.push(MatchResult {
                entry: Arc::clone(entry),
                operation,
                params: captures.into_iter().collect(),
            });
        }

        if matches.is_empty() {
            return Err(ContractError::OperationNotDeclared {
                method: method.to_ascii_uppercase(),
                path: path.to_string(),
            });
        }

        debug!(
            path,
            method = %method.to_ascii_uppercase(),
            matches = matches.len(),
            "resolved operation candidates"
        );

        Ok(matches)
    }

    /// Returns `true` if any entry's pattern matches the path.
    #[must_use]
    pub fn has_route(&self, path: &str) -> bool {
        self.index.entries().iter().any(|e| e.pattern().matches(path))
    }
}
