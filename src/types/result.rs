//! Generation result and backend id provenance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::normalize;

/// Outcome of one completed generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub generation_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

/// Where a result's generation id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSource {
    Backend,
    Local,
}

impl IdSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdSource::Backend => "backend",
            IdSource::Local => "local",
        }
    }
}

/// Backend-assigned id from `generation_id`/`id`, at top level or under `metadata`.
pub fn backend_generation_id(raw: &Value) -> Option<String> {
    let lookup = |v: &Value| -> Option<String> {
        ["generation_id", "id"].iter().find_map(|key| match v.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    };
    lookup(raw).or_else(|| raw.get("metadata").and_then(lookup))
}

/// Resolve the id for a result: the backend id wins whenever present.
pub fn resolve_generation_id(raw: &Value, fallback: Option<&str>) -> (String, IdSource) {
    match backend_generation_id(raw) {
        Some(id) => (id, IdSource::Backend),
        None => (
            fallback
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            IdSource::Local,
        ),
    }
}

/// Backend `progress` as a 0-100 percentage.
pub fn progress_percent(raw: &Value) -> Option<u8> {
    let p = raw.get("progress")?.as_f64()?;
    Some(p.clamp(0.0, 100.0).round() as u8)
}

impl GenerationResult {
    /// Build a result from a success payload.
    ///
    /// `fallback_id` is used as the id only when the backend omitted one; when `None`
    /// a fresh UUID is generated.
    pub fn from_backend(raw: &Value, fallback_id: Option<&str>) -> Self {
        let (generation_id, id_source) = resolve_generation_id(raw, fallback_id);

        let mut metadata = raw
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        metadata.insert(
            "id_source".to_string(),
            Value::String(id_source.as_str().to_string()),
        );
        if let Some(status) = raw.get("status").and_then(Value::as_str) {
            metadata.insert("status".to_string(), Value::String(status.to_string()));
        }

        let error = raw
            .get("error")
            .and_then(|e| match e {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty());
        let success = raw
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(error.is_none());

        Self {
            success,
            generation_id,
            content: normalize::extract(raw),
            metadata,
            error,
            progress: progress_percent(raw),
        }
    }

    pub fn id_source(&self) -> Option<IdSource> {
        match self.metadata.get("id_source").and_then(Value::as_str) {
            Some("backend") => Some(IdSource::Backend),
            Some("local") => Some(IdSource::Local),
            _ => None,
        }
    }
}
