//! Resolved operation parameters.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ContractError, ContractResult};

/// Swagger 2 keywords lifted into a schema when a parameter has no `schema`.
const INLINE_SCHEMA_KEYWORDS: [&str; 16] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
];

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    /// Path placeholder.
    Path,
    /// Query string.
    Query,
    /// Request header.
    Header,
    /// JSON request body.
    Body,
    /// Form field. Recognized but not validated.
    FormData,
    /// Cookie. Recognized but not validated.
    Cookie,
}

impl ParameterLocation {
    /// Parses the `in` field of a parameter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    /// Returns the name used in error locations and validated sections.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
            Self::FormData => "formData",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How array values are serialized in a single string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    /// Comma separated (`a,b`).
    #[default]
    Csv,
    /// Space separated (`a b`).
    Ssv,
    /// Tab separated.
    Tsv,
    /// Pipe separated (`a|b`).
    Pipes,
    /// Repeated keys (`?tag=a&tag=b`), never split.
    Multi,
}

impl CollectionFormat {
    /// Parses a Swagger 2 `collectionFormat` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "csv" => Some(Self::Csv),
            "ssv" => Some(Self::Ssv),
            "tsv" => Some(Self::Tsv),
            "pipes" => Some(Self::Pipes),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }

    /// Maps an OpenAPI 3 `style`/`explode` pair.
    fn from_style(style: &str, explode: bool) -> Self {
        match style {
            "spaceDelimited" => Self::Ssv,
            "pipeDelimited" => Self::Pipes,
            "form" if explode => Self::Multi,
            _ => Self::Csv,
        }
    }

    /// Returns the separator, or `None` for [`CollectionFormat::Multi`].
    #[must_use]
    pub const fn delimiter(self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Ssv => Some(' '),
            Self::Tsv => Some('\t'),
            Self::Pipes => Some('|'),
            Self::Multi => None,
        }
    }
}

/// A fully resolved parameter. Never a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name. Lower-cased for headers.
    pub name: String,
    /// Request location.
    pub location: ParameterLocation,
    /// Whether the parameter must be present.
    pub required: bool,
    /// JSON schema for the value.
    pub schema: Value,
    /// Array serialization.
    pub collection_format: CollectionFormat,
}

impl Parameter {
    /// Builds a parameter from its specification object.
    ///
    /// `context` names where the object was found and is used in errors.
    pub fn from_value(raw: &Value, context: &str) -> ContractResult<Self> {
        let invalid = |reason: &str| ContractError::InvalidSchema {
            location: context.to_string(),
            reason: reason.to_string(),
        };

        let object = raw
            .as_object()
            .ok_or_else(|| invalid("parameter must be an object"))?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("parameter without 'name'"))?;
        let location_raw = object
            .get("in")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("parameter without 'in'"))?;
        let location = ParameterLocation::parse(location_raw)
            .ok_or_else(|| invalid(&format!("unknown parameter location '{location_raw}'")))?;

        let name = if location == ParameterLocation::Header {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        };

        let required = location == ParameterLocation::Path
            || object.get("required").and_then(Value::as_bool).unwrap_or(false);

        let schema = match object.get("schema") {
            Some(schema) => schema.clone(),
            None => Value::Object(
                INLINE_SCHEMA_KEYWORDS
                    .iter()
                    .filter_map(|key| object.get(*key).map(|v| ((*key).to_string(), v.clone())))
                    .collect::<Map<String, Value>>(),
            ),
        };

        let collection_format = if let Some(format) = object.get("collectionFormat").and_then(Value::as_str) {
            CollectionFormat::parse(format)
                .ok_or_else(|| invalid(&format!("unknown collectionFormat '{format}'")))?
        } else if let Some(style) = object.get("style").and_then(Value::as_str) {
            let explode = object
                .get("explode")
                .and_then(Value::as_bool)
                .unwrap_or(style == "form");
            CollectionFormat::from_style(style, explode)
        } else {
            CollectionFormat::default()
        };

        Ok(Self {
            name,
            location,
            required,
            schema,
            collection_format,
        })
    }

    /// Identity used for deduplication.
    #[must_use]
    pub fn key(&self) -> (ParameterLocation, &str) {
        (self.location, &self.name)
    }

    /// Returns the schema `default`, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.schema.get("default")
    }
}
