//! Line formats for search results.

use syndic8_core::{FeedRecord, Value};

/// Fields shown when none are requested: the configured keys without the
/// long free-text ones.
pub fn default_fields(keys: &[String]) -> Vec<String> {
    keys.iter()
        .filter(|k| !matches!(k.as_str(), "description" | "siteurl"))
        .cloned()
        .collect()
}

/// `"a","b","c"`, with embedded double quotes backslash-escaped. Missing
/// fields print as an empty pair of quotes.
pub fn quoted_line(record: &FeedRecord, fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| {
            let text = record.get(field).map(Value::to_string).unwrap_or_default();
            format!("\"{}\"", text.replace('"', "\\\""))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// One JSON object holding just `fields`.
pub fn json_line(record: &FeedRecord, fields: &[String]) -> String {
    let object: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|field| {
            let value = record.get(field).map(Value::to_json).unwrap_or(serde_json::Value::Null);
            (field.clone(), value)
        })
        .collect();
    serde_json::Value::Object(object).to_string()
}
