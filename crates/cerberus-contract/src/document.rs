//! Specification document loading.
//!
//! A [`SpecDocument`] is an immutable JSON tree shared behind an `Arc`. It is
//! loaded once from JSON or YAML and never mutated afterwards; everything the
//! index derives from it lives in separate structures.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::fs;
use tracing::info;

use crate::error::{ContractError, ContractResult};

/// Document key holding the conditional validation rule table.
pub const RULES_KEY: &str = "x-conditional-validation-rules";

/// Top-level sections that schemas may reference with `$ref`.
const SHARED_SECTIONS: [&str; 2] = ["definitions", "components"];

/// A loaded specification document.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    root: Arc<Value>,
}

impl SpecDocument {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> ContractResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ContractError::Parse(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> ContractResult<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ContractError::Parse(format!("invalid YAML: {e}")))?;
        Self::from_value(value)
    }

    /// Wraps an already parsed document. The root must be an object.
    pub fn from_value(value: Value) -> ContractResult<Self> {
        if !value.is_object() {
            return Err(ContractError::Parse(
                "document root must be an object".to_string(),
            ));
        }
        if let Some(paths) = value.get("paths") {
            if !paths.is_object() {
                return Err(ContractError::Parse(
                    "'paths' must be an object".to_string(),
                ));
            }
        }
        Ok(Self {
            root: Arc::new(value),
        })
    }

    /// Loads a document from disk. Files ending in `.yaml` or `.yml` are
    /// parsed as YAML, everything else as JSON.
    pub async fn from_file(path: impl AsRef<Path>) -> ContractResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading specification from file");

        let content = fs::read_to_string(path).await.map_err(|e| {
            ContractError::Load(format!("failed to read {}: {e}", path.display()))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Returns the document root.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Returns the `paths` mapping, if present.
    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.root.get("paths").and_then(Value::as_object)
    }

    /// Looks up a JSON pointer (`/parameters/limit`).
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Returns the conditional validation rule section, if present.
    #[must_use]
    pub fn rules_section(&self) -> Option<&Value> {
        self.root.get(RULES_KEY)
    }

    /// Returns the sections schemas may reference (`definitions`, `components`).
    ///
    /// They are attached to every compiled schema root so that local `$ref`s
    /// resolve.
    #[must_use]
    pub fn shared_sections(&self) -> Map<String, Value> {
        SHARED_SECTIONS
            .iter()
            .filter_map(|key| self.root.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect()
    }
}
