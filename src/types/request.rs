//! Generation request value and its wire payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_AUDIENCE: &str = "general";
const DEFAULT_PLATFORM: &str = "blog";
const DEFAULT_LENGTH: &str = "medium";
const DEFAULT_TONE: &str = "professional";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// How the caller wants to follow the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Wait for the HTTP response only.
    #[default]
    Standard,
    /// Submit, then follow progress over the channel.
    Async,
    /// Like `Async`, with the backend streaming intermediate agent output.
    Streaming,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Standard => "standard",
            GenerationMode::Async => "async",
            GenerationMode::Streaming => "streaming",
        }
    }

    /// Whether a progress channel should be opened after submission.
    pub fn wants_progress(&self) -> bool {
        !matches!(self, GenerationMode::Standard)
    }
}

/// An immutable generation submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub template: String,
    pub style_profile: String,
    pub topic: Option<String>,
    pub parameters: BTreeMap<String, Value>,
    pub priority: Priority,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub mode: GenerationMode,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(template: impl Into<String>, style_profile: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            style_profile: style_profile.into(),
            topic: None,
            parameters: BTreeMap::new(),
            priority: Priority::default(),
            timeout: DEFAULT_TIMEOUT,
            mode: GenerationMode::default(),
            created_at: Utc::now(),
            user_id: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Topic actually sent: explicit topic, then the `topic` parameter, then a synthesized one.
    pub fn effective_topic(&self) -> String {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.parameters
                    .get("topic")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                format!("{} content in {} style", self.template, self.style_profile)
            })
    }

    fn string_param(&self, key: &str, default: &str) -> String {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    }

    fn tags(&self) -> Value {
        match self.parameters.get("tags") {
            Some(Value::Array(items)) => Value::Array(items.clone()),
            Some(Value::String(s)) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| Value::String(t.to_string()))
                    .collect(),
            ),
            _ => Value::Array(Vec::new()),
        }
    }

    /// Assemble the `POST /api/generate` body.
    ///
    /// Well-known parameters are lifted to top-level fields with defaults; the full
    /// parameter map is always forwarded as `dynamic_parameters`.
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "template": self.template,
            "style_profile": self.style_profile,
            "topic": self.effective_topic(),
            "audience": self.string_param("audience", DEFAULT_AUDIENCE),
            "platform": self.string_param("platform", DEFAULT_PLATFORM),
            "length": self.string_param("length", DEFAULT_LENGTH),
            "tags": self.tags(),
            "tone": self.string_param("tone", DEFAULT_TONE),
            "dynamic_parameters": self.parameters,
            "priority": self.priority,
            "timeout_seconds": self.timeout.as_secs(),
            "generation_mode": self.mode.as_str(),
            "created_at": self.created_at.to_rfc3339(),
        });
        if let (Some(user_id), Some(map)) = (&self.user_id, payload.as_object_mut()) {
            map.insert("user_id".to_string(), Value::String(user_id.clone()));
        }
        payload
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_fills_defaults_and_synthesizes_topic() {
        let request = GenerationRequest::new("newsletter", "witty");
        let payload = request.to_payload();
        assert_eq!(payload["topic"], "newsletter content in witty style");
        assert_eq!(payload["audience"], DEFAULT_AUDIENCE);
        assert_eq!(payload["platform"], DEFAULT_PLATFORM);
        assert_eq!(payload["length"], DEFAULT_LENGTH);
        assert_eq!(payload["tone"], DEFAULT_TONE);
        assert_eq!(payload["tags"], json!([]));
        assert_eq!(payload["priority"], "normal");
        assert_eq!(payload["generation_mode"], "standard");
        assert_eq!(payload["timeout_seconds"], 120);
        assert!(payload.get("user_id").is_none());
    }

    #[test]
    fn payload_prefers_caller_parameters() {
        let request = GenerationRequest::new("newsletter", "witty")
            .with_parameter("topic", "Release notes")
            .with_parameter("audience", "maintainers")
            .with_parameter("tags", "rust, async ,")
            .with_parameter("word_count", 600)
            .with_user_id("u-7");
        let payload = request.to_payload();
        assert_eq!(payload["topic"], "Release notes");
        assert_eq!(payload["audience"], "maintainers");
        assert_eq!(payload["tags"], json!(["rust", "async"]));
        assert_eq!(payload["dynamic_parameters"]["word_count"], 600);
        assert_eq!(payload["user_id"], "u-7");
    }

    #[test]
    fn explicit_topic_beats_parameter() {
        let request = GenerationRequest::new("t", "s")
            .with_topic("Explicit")
            .with_parameter("topic", "From params");
        assert_eq!(request.effective_topic(), "Explicit");
    }
}
