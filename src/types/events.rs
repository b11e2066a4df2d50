//! Frames exchanged over the progress channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tagged JSON frame. Unknown `type` values decode to [`ChannelMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    StatusUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_step: Option<String>,
    },

    AgentUpdate {
        #[serde(default)]
        agent: String,
        #[serde(default)]
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },

    Completion {
        #[serde(default)]
        result: Value,
    },

    Error {
        #[serde(default)]
        error: Value,
    },

    Ping,

    Pong,

    /// Outbound only: ask the backend to stop work on a generation.
    Cancel {
        generation_id: String,
    },

    #[serde(other)]
    Unknown,
}

impl ChannelMessage {
    /// Decode one text frame. Malformed frames yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn to_text(&self) -> String {
        // Serializing a derive(Serialize) enum of owned values cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Render an `agent_update.result` or `error.error` value as short text.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_tags() {
        let msg = ChannelMessage::parse(
            r#"{"type":"status_update","generation_id":"g","status":"running","progress":40,"current_step":"draft"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ChannelMessage::StatusUpdate {
                generation_id: Some("g".into()),
                status: Some("running".into()),
                progress: Some(40.0),
                current_step: Some("draft".into()),
            }
        );
        assert_eq!(
            ChannelMessage::parse(r#"{"type":"pong"}"#),
            Some(ChannelMessage::Pong)
        );
    }

    #[test]
    fn unknown_tags_are_tolerated() {
        assert_eq!(
            ChannelMessage::parse(r#"{"type":"heartbeat_v2","x":1}"#),
            Some(ChannelMessage::Unknown)
        );
        assert_eq!(ChannelMessage::parse("not json"), None);
    }

    #[test]
    fn outbound_frames_are_tagged() {
        let text = ChannelMessage::Cancel {
            generation_id: "g9".into(),
        }
        .to_text();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "cancel", "generation_id": "g9"}));
        assert_eq!(ChannelMessage::Ping.to_text(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn error_values_render_as_text() {
        assert_eq!(
            value_text(&json!({"message": "agent crashed"})).as_deref(),
            Some("agent crashed")
        );
        assert_eq!(value_text(&Value::Null), None);
    }
}
