//! Lenient parsing of LLM JSON responses.
//!
//! Models wrap JSON in prose and code fences often enough that strict
//! parsing throws away good output. The strategy: try the whole body,
//! then the first bracketed substring. Irrecoverable responses yield an
//! empty set, never an error.

use super::AngleSpec;
use serde_json::Value;

/// Best-effort extraction of a JSON array from a model response.
pub fn extract_json_array(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(array) = into_array(value) {
            return Some(array);
        }
    }

    // Substring extraction: first `[...]`, then first `{...}`.
    for (open, close) in [('[', ']'), ('{', '}')] {
        let start = trimmed.find(open)?;
        if let Some(end) = trimmed.rfind(close) {
            if end > start {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    if let Some(array) = into_array(value) {
                        return Some(array);
                    }
                }
            }
        }
    }

    None
}

/// An array passes through; an object yields its first array field.
fn into_array(value: Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value),
        Value::Object(map) => map.into_iter().map(|(_, v)| v).find(Value::is_array),
        _ => None,
    }
}

/// Parse the stage-1 response into at most `max` angle specs.
pub fn parse_angles(text: &str, max: usize) -> Vec<AngleSpec> {
    let Some(Value::Array(items)) = extract_json_array(text) else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let angle_name = obj.get("angle_name")?.as_str()?.trim().to_string();
            if angle_name.is_empty() {
                return None;
            }
            Some(AngleSpec {
                angle_name,
                setup: obj
                    .get("setup")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                keywords: obj
                    .get("keywords")
                    .and_then(Value::as_array)
                    .map(|kws| {
                        kws.iter()
                            .filter_map(Value::as_str)
                            .map(ToString::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            })
        })
        .take(max)
        .collect()
}

/// Parse the stage-2 response into headline strings.
///
/// Accepts both bare string arrays and arrays of objects with a
/// `headline` field.
pub fn parse_headlines(text: &str, max: usize) -> Vec<String> {
    let Some(Value::Array(items)) = extract_json_array(text) else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            Value::Object(obj) => obj
                .get("headline")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            _ => None,
        })
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}
