//! # Content Normalizer
//!
//! Extracts the generated text from a backend response of unknown shape.
//!
//! The backend is a multi-agent pipeline whose field naming has changed over
//! time, so the final text may sit under any of [`CONTENT_FIELDS`], at the top
//! level, under `state`, or under one of [`STATE_WRAPPERS`]. Extraction tries,
//! in order (first non-empty trimmed string wins):
//!
//! 1. every content field at the top level
//! 2. every content field under `state`
//! 3. every content field under each state wrapper
//! 4. the raw value itself when it is a string longer than 50 characters
//! 5. the first string longer than 100 characters found depth-first, at most
//!    [`MAX_SEARCH_DEPTH`] levels below the root
//!
//! and returns an empty string otherwise.
//!
//! ```rust
//! use generation_gateway::normalize::extract;
//! use serde_json::json;
//!
//! assert_eq!(extract(&json!({"formatted_content": "  Hello world  "})), "Hello world");
//! assert_eq!(extract(&json!({"status": "ok"})), "");
//! ```

use serde_json::Value;

/// Known content field names, in priority order. The last two are legacy aliases.
pub const CONTENT_FIELDS: &[&str] = &[
    "content",
    "formatted_content",
    "edited_content",
    "draft_content",
    "draft",
    "result",
    "final_content",
    "output",
    "generated_content",
    "text",
];

/// Wrapper objects that may hold a pipeline state, in priority order.
pub const STATE_WRAPPERS: &[&str] = &["agent_state", "final_state", "graph_state", "result_state"];

pub const MAX_SEARCH_DEPTH: usize = 3;

const MIN_RAW_STRING_CHARS: usize = 50;
const MIN_DEEP_STRING_CHARS: usize = 100;

/// Extract the generated text. Never fails; returns `""` when nothing qualifies.
pub fn extract(raw: &Value) -> String {
    if let Some(found) = from_fields(raw) {
        return found;
    }
    if let Some(found) = raw.get("state").and_then(from_fields) {
        return found;
    }
    for wrapper in STATE_WRAPPERS {
        if let Some(found) = raw.get(*wrapper).and_then(from_fields) {
            return found;
        }
    }
    if let Value::String(s) = raw {
        let trimmed = s.trim();
        if trimmed.chars().count() > MIN_RAW_STRING_CHARS {
            return trimmed.to_string();
        }
    }
    deep_search(raw, 0).unwrap_or_default()
}

/// First known field holding a non-blank string.
fn from_fields(obj: &Value) -> Option<String> {
    let map = obj.as_object()?;
    CONTENT_FIELDS.iter().find_map(|field| match map.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn deep_search(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (trimmed.chars().count() > MIN_DEEP_STRING_CHARS).then(|| trimmed.to_string())
        }
        Value::Object(map) => map.values().find_map(|v| deep_search(v, depth + 1)),
        Value::Array(items) => items.iter().find_map(|v| deep_search(v, depth + 1)),
        _ => None,
    }
}
