//! Conditional validation rules.
//!
//! When several specification entries match one request path (sibling
//! templates such as `/widgets?v=a` and `/widgets?v=b`), a rule table decides
//! which one validates the request. The table lives under
//! `x-conditional-validation-rules`:
//!
//! ```yaml
//! x-conditional-validation-rules:
//!   /widgets:
//!     in: header
//!     name: X-Variant
//!     rules:
//!       legacy: /widgets?v=a
//!     default: /widgets?v=b
//! ```

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::document::{SpecDocument, RULES_KEY};
use crate::error::{ContractError, ContractResult};
use crate::pattern::{normalize_template, PathPattern};
use crate::request::RequestParts;
use crate::resolver::MatchResult;

/// One rule: where to read the discriminator and how to map it.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pattern: PathPattern,
    location: String,
    name: String,
    rules: IndexMap<String, String>,
    default: Option<String>,
}

impl ValidationRule {
    fn from_value(template: &str, raw: &Value) -> ContractResult<Self> {
        let location = format!("{RULES_KEY}.{template}");
        let invalid = |reason: &str| ContractError::InvalidSchema {
            location: location.clone(),
            reason: reason.to_string(),
        };

        let field = |key: &str| -> ContractResult<String> {
            raw.get(key)
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| invalid(&format!("missing string field '{key}'")))
        };

        let rules = match raw.get("rules") {
            None => IndexMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(value, target)| {
                    target
                        .as_str()
                        .map(|t| (value.clone(), t.to_string()))
                        .ok_or_else(|| invalid(&format!("target for '{value}' must be a string")))
                })
                .collect::<ContractResult<_>>()?,
            Some(_) => return Err(invalid("'rules' must be an object")),
        };

        Ok(Self {
            pattern: PathPattern::compile(template)?,
            location: field("in")?,
            name: field("name")?,
            rules,
            default: raw.get("default").and_then(Value::as_str).map(ToString::to_string),
        })
    }

    /// Returns the rule's path template.
    #[must_use]
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    /// Reads the discriminator from the request. Missing values read as "".
    #[must_use]
    pub fn discriminator(&self, request: &RequestParts) -> String {
        match self.location.as_str() {
            "header" => request.header(&self.name).unwrap_or_default().to_string(),
            "path" | "param" => self
                .pattern
                .captures(&request.path)
                .and_then(|caps| caps.into_iter().find(|(n, _)| *n == self.name).map(|(_, v)| v))
                .or_else(|| request.params.get(&self.name).cloned())
                .unwrap_or_default(),
            section => request
                .section(section)
                .and_then(|value| lookup_dotted(&value, &self.name).map(scalar_string))
                .unwrap_or_default(),
        }
    }

    /// Maps a discriminator value to a target template, falling back to the
    /// default rule.
    #[must_use]
    pub fn target(&self, value: &str) -> Option<&str> {
        self.rules
            .get(value)
            .or(self.default.as_ref())
            .map(String::as_str)
    }
}

/// All conditional validation rules of a document.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<ValidationRule>,
}

impl RuleTable {
    /// Reads the rule section. A document without one yields an empty table.
    pub fn from_document(document: &SpecDocument) -> ContractResult<Self> {
        let Some(section) = document.rules_section() else {
            return Ok(Self::default());
        };
        let section = section.as_object().ok_or_else(|| ContractError::InvalidSchema {
            location: RULES_KEY.to_string(),
            reason: "must be an object".to_string(),
        })?;

        let rules = section
            .iter()
            .map(|(template, raw)| ValidationRule::from_value(template, raw))
            .collect::<ContractResult<Vec<_>>>()?;

        debug!(rules = rules.len(), "conditional validation rules loaded");
        Ok(Self { rules })
    }

    /// Returns `true` if no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns the first rule whose template matches the path.
    #[must_use]
    pub fn rule_for(&self, path: &str) -> Option<&ValidationRule> {
        self.rules.iter().find(|rule| rule.pattern.matches(path))
    }

    /// Picks exactly one candidate for a request.
    ///
    /// A single candidate is returned as-is. Otherwise the rule for the
    /// request path maps the discriminator to a target template, which must
    /// equal one candidate's template after normalization.
    pub fn select<'m>(
        &self,
        matches: &'m [MatchResult],
        request: &RequestParts,
    ) -> ContractResult<&'m MatchResult> {
        match matches {
            [] => {
                return Err(ContractError::OperationNotDeclared {
                    method: request.method.as_str().to_ascii_uppercase(),
                    path: request.path.clone(),
                })
            }
            [only] => return Ok(only),
            _ => {}
        }

        let not_found = || ContractError::RulesNotFound {
            path: request.path.clone(),
        };

        let rule = self.rule_for(&request.path).ok_or_else(not_found)?;
        let value = rule.discriminator(request);
        let target = rule.target(&value).ok_or_else(not_found)?;
        let wanted = normalize_template(target);

        debug!(
            path = %request.path,
            discriminator = %value,
            selected = %target,
            candidates = matches.len(),
            "selecting operation by rule"
        );

        matches
            .iter()
            .find(|m| normalize_template(m.entry.template()) == wanted)
            .ok_or_else(|| ContractError::RuleTargetNotFound {
                path: request.path.clone(),
                target: target.to_string(),
            })
    }
}

/// Follows a dotted path (`meta.kind`) into a JSON value.
fn lookup_dotted<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
