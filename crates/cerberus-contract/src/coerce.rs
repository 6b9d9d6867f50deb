//! Type coercion and default filling.
//!
//! Request parameters arrive as strings. Before schema validation they are
//! converted to the type their schema declares. Values that cannot be
//! converted are left as strings so that validation reports them.
//!
//! Coercion is idempotent: coercing an already coerced value returns it
//! unchanged.

use serde_json::{Number, Value};

use crate::parameter::CollectionFormat;

/// Longest `$ref` chain followed while filling defaults.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Returns the first non-`null` type a schema declares.
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

/// Coerces the raw string values of one parameter.
///
/// Array schemas take every value; repeated values are used as-is, a single
/// value is split by `format`. Scalar schemas take the first value.
#[must_use]
pub fn coerce_raw(values: &[String], schema: &Value, format: CollectionFormat) -> Option<Value> {
    if schema_type(schema) == Some("array") {
        let items: Vec<String> = match (values, format.delimiter()) {
            ([single], Some(delimiter)) if !single.is_empty() => {
                single.split(delimiter).map(ToString::to_string).collect()
            }
            ([single], Some(_)) if single.is_empty() => Vec::new(),
            _ => values.to_vec(),
        };
        let item_schema = schema.get("items").unwrap_or(&Value::Null);
        return Some(Value::Array(
            items
                .into_iter()
                .map(|item| coerce_value(Value::String(item), item_schema))
                .collect(),
        ));
    }

    values
        .first()
        .map(|first| coerce_value(Value::String(first.clone()), schema))
}

/// Collects the raw string values of one parameter without coercion.
///
/// Array schemas keep every value as a string array; scalar schemas take the
/// first value.
#[must_use]
pub fn raw_value(values: &[String], schema: &Value) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    if schema_type(schema) == Some("array") {
        return Some(Value::Array(values.iter().cloned().map(Value::String).collect()));
    }
    values.first().cloned().map(Value::String)
}

/// Coerces a JSON value toward the schema's declared type.
#[must_use]
pub fn coerce_value(value: Value, schema: &Value) -> Value {
    match (value, schema_type(schema)) {
        (Value::String(s), Some(kind)) => coerce_str(s, kind, schema),
        (Value::Array(items), Some("array")) => {
            let item_schema = schema.get("items").unwrap_or(&Value::Null);
            Value::Array(
                items
                    .into_iter()
                    .map(|item| coerce_value(item, item_schema))
                    .collect(),
            )
        }
        (value, _) => value,
    }
}

fn coerce_str(s: String, kind: &str, schema: &Value) -> Value {
    match kind {
        "integer" => s
            .trim()
            .parse::<i64>()
            .map_or(Value::String(s), |n| Value::Number(n.into())),
        "number" => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                Value::Number(n.into())
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or(Value::String(s), Value::Number)
            }
        }
        "boolean" => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(s),
        },
        "object" => match serde_json::from_str::<Value>(&s) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => Value::String(s),
        },
        "array" => {
            let item_schema = schema.get("items").unwrap_or(&Value::Null);
            Value::Array(
                s.split(',')
                    .map(|item| coerce_value(Value::String(item.to_string()), item_schema))
                    .collect(),
            )
        }
        _ => Value::String(s),
    }
}

/// Fills absent object properties from schema `default`s, recursively.
///
/// Local `$ref`s are looked up in `root`.
pub fn apply_defaults(value: &mut Value, schema: &Value, root: &Value) {
    apply_defaults_at(value, schema, root, 0);
}

fn apply_defaults_at(value: &mut Value, schema: &Value, root: &Value, depth: usize) {
    if depth > MAX_REFERENCE_DEPTH {
        return;
    }
    let schema = match schema.get("$ref").and_then(Value::as_str) {
        Some(reference) => match reference.strip_prefix('#').and_then(|p| root.pointer(p)) {
            Some(target) => return apply_defaults_at(value, target, root, depth + 1),
            None => return,
        },
        None => schema,
    };

    if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
        for part in all_of {
            apply_defaults_at(value, part, root, depth + 1);
        }
    }

    match value {
        Value::Object(object) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (name, property) in properties {
                match object.get_mut(name) {
                    Some(existing) => apply_defaults_at(existing, property, root, depth + 1),
                    None => {
                        if let Some(default) = resolve(property, root).and_then(|p| p.get("default")) {
                            object.insert(name.clone(), default.clone());
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    apply_defaults_at(item, item_schema, root, depth + 1);
                }
            }
        }
        _ => {}
    }
}

/// Follows a local `$ref` chain to the schema it names.
fn resolve<'a>(schema: &'a Value, root: &'a Value) -> Option<&'a Value> {
    let mut current = schema;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current.get("$ref").and_then(Value::as_str) {
            Some(reference) => current = root.pointer(reference.strip_prefix('#')?)?,
            None => return Some(current),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_coerce_integer() {
        let schema = json!({"type": "integer"});
        assert_eq!(coerce_value(json!("5"), &schema), json!(5));
        assert_eq!(coerce_value(json!(5), &schema), json!(5));
        assert_eq!(coerce_value(json!("five"), &schema), json!("five"));
        assert_eq!(coerce_value(json!("5.5"), &schema), json!("5.5"));
    }

    #[test]
    fn test_coerce_number() {
        let schema = json!({"type": "number"});
        assert_eq!(coerce_value(json!("5"), &schema), json!(5));
        assert_eq!(coerce_value(json!("2.5"), &schema), json!(2.5));
        assert_eq!(coerce_value(json!("NaN"), &schema), json!("NaN"));
    }

    #[test]
    fn test_coerce_boolean() {
        let schema = json!({"type": "boolean"});
        assert_eq!(coerce_value(json!("true"), &schema), json!(true));
        assert_eq!(coerce_value(json!("false"), &schema), json!(false));
        assert_eq!(coerce_value(json!("yes"), &schema), json!("yes"));
    }

    #[test]
    fn test_coerce_object() {
        let schema = json!({"type": "object"});
        assert_eq!(coerce_value(json!(r#"{"a":1}"#), &schema), json!({"a": 1}));
        assert_eq!(coerce_value(json!("[1]"), &schema), json!("[1]"));
    }

    #[test]
    fn test_nullable_type_list() {
        let schema = json!({"type": ["null", "integer"]});
        assert_eq!(coerce_value(json!("7"), &schema), json!(7));
    }

    #[test]
    fn test_coerce_raw_scalar_takes_first() {
        let schema = json!({"type": "integer"});
        assert_eq!(
            coerce_raw(&strings(&["5", "6"]), &schema, CollectionFormat::Csv),
            Some(json!(5))
        );
        assert_eq!(coerce_raw(&[], &schema, CollectionFormat::Csv), None);
    }

    #[test]
    fn test_raw_value_keeps_repeated_values() {
        let schema = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(raw_value(&strings(&["1", "2"]), &schema), Some(json!(["1", "2"])));
        assert_eq!(
            raw_value(&strings(&["1", "2"]), &json!({"type": "integer"})),
            Some(json!("1"))
        );
        assert_eq!(raw_value(&[], &schema), None);
    }

    #[test]
    fn test_coerce_raw_arrays() {
        let schema = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(
            coerce_raw(&strings(&["1,2,3"]), &schema, CollectionFormat::Csv),
            Some(json!([1, 2, 3]))
        );
        assert_eq!(
            coerce_raw(&strings(&["1|2"]), &schema, CollectionFormat::Pipes),
            Some(json!([1, 2]))
        );
        assert_eq!(
            coerce_raw(&strings(&["1 2"]), &schema, CollectionFormat::Ssv),
            Some(json!([1, 2]))
        );
        assert_eq!(
            coerce_raw(&strings(&["1,2"]), &schema, CollectionFormat::Multi),
            Some(json!(["1,2"]))
        );
        assert_eq!(
            coerce_raw(&strings(&["1", "2"]), &schema, CollectionFormat::Csv),
            Some(json!([1, 2]))
        );
        assert_eq!(
            coerce_raw(&strings(&[""]), &schema, CollectionFormat::Csv),
            Some(json!([]))
        );
    }

    #[test]
    fn test_apply_defaults_nested_and_ref() {
        let root = json!({
            "definitions": {
                "Owner": {
                    "type": "object",
                    "properties": {"active": {"type": "boolean", "default": true}}
                }
            }
        });
        let schema = json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "default": "available"},
                "name": {"type": "string"},
                "owner": {"$ref": "#/definitions/Owner"}
            }
        });

        let mut value = json!({"name": "rex", "owner": {}});
        apply_defaults(&mut value, &schema, &root);
        assert_eq!(
            value,
            json!({"name": "rex", "owner": {"active": true}, "status": "available"})
        );
    }

    #[test]
    fn test_apply_defaults_keeps_present_values() {
        let schema = json!({"properties": {"status": {"default": "available"}}});
        let mut value = json!({"status": "sold"});
        apply_defaults(&mut value, &schema, &Value::Null);
        assert_eq!(value, json!({"status": "sold"}));
    }

    #[test]
    fn test_apply_defaults_array_items() {
        let schema = json!({
            "type": "array",
            "items": {"properties": {"qty": {"default": 1}}}
        });
        let mut value = json!([{}, {"qty": 3}]);
        apply_defaults(&mut value, &schema, &Value::Null);
        assert_eq!(value, json!([{"qty": 1}, {"qty": 3}]));
    }

    proptest! {
        #[test]
        fn prop_integer_coercion_idempotent(n in any::<i64>()) {
            let schema = json!({"type": "integer"});
            let once = coerce_value(Value::String(n.to_string()), &schema);
            prop_assert_eq!(&once, &json!(n));
            prop_assert_eq!(coerce_value(once.clone(), &schema), once);
        }

        #[test]
        fn prop_string_coercion_idempotent(s in "\\PC{0,12}") {
            for kind in ["integer", "number", "boolean", "string"] {
                let schema = json!({"type": kind});
                let once = coerce_value(Value::String(s.clone()), &schema);
                prop_assert_eq!(coerce_value(once.clone(), &schema), once);
            }
        }
    }
}
