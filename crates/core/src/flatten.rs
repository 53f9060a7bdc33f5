//! Flattening of nested JSON into retrievable text lines

use serde_json::{Map, Value as JsonValue};

/// Flatten a schema description into `path: type` lines.
///
/// Nested objects extend the path with `key.`; arrays describe their element
/// through the first item under `key[].`.
///
/// ```
/// let schema = serde_json::json!({"patients": {"age": "int", "visits": [{"date": "date"}]}});
/// assert_eq!(
///     mediquest_core::flatten_schema(&schema),
///     vec!["patients.age: int", "patients.visits[].date: date"],
/// );
/// ```
pub fn flatten_schema(schema: &JsonValue) -> Vec<String> {
    let mut lines = Vec::new();
    if let JsonValue::Object(map) = schema {
        flatten_schema_into(map, "", &mut lines);
    }
    lines
}

fn flatten_schema_into(map: &Map<String, JsonValue>, prefix: &str, lines: &mut Vec<String>) {
    for (key, value) in map {
        match value {
            JsonValue::Object(inner) => {
                flatten_schema_into(inner, &format!("{prefix}{key}."), lines);
            }
            JsonValue::Array(items) => match items.first() {
                Some(JsonValue::Object(inner)) => {
                    flatten_schema_into(inner, &format!("{prefix}{key}[]."), lines);
                }
                Some(scalar) => lines.push(format!("{prefix}{key}[]: {}", render_scalar(scalar))),
                None => {}
            },
            scalar => lines.push(format!("{prefix}{key}: {}", render_scalar(scalar))),
        }
    }
}

/// Flatten an arbitrary document into `key: value` lines for summarization.
///
/// Nested objects prefix their children with `key: `; list items become
/// `key[i]` entries under the current prefix.
pub fn flatten_json(document: &JsonValue) -> Vec<String> {
    let mut lines = Vec::new();
    if let JsonValue::Object(map) = document {
        for (key, value) in map {
            flatten_entry(key, value, "", &mut lines);
        }
    }
    lines
}

fn flatten_entry(key: &str, value: &JsonValue, prefix: &str, lines: &mut Vec<String>) {
    match value {
        JsonValue::Object(inner) => {
            let nested = format!("{prefix}{key}: ");
            for (k, v) in inner {
                flatten_entry(k, v, &nested, lines);
            }
        }
        JsonValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_entry(&format!("{key}[{i}]"), item, prefix, lines);
            }
        }
        scalar => lines.push(format!("{prefix}{key}: {}", render_scalar(scalar))),
    }
}

/// Render a stored record as `key: value` lines, skipping `_id`.
pub fn record_to_text(record: &Map<String, JsonValue>) -> String {
    record
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .map(|(key, value)| format!("{key}: {}", render_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(_) | JsonValue::Array(_) => value.to_string(),
        scalar => render_scalar(scalar),
    }
}
