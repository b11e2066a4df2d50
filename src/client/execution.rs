//! Request execution: one attempt, and the retried submission built on it.

use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::core::GatewayClient;
use super::error_classification::ErrorCategory;
use super::policy::{Attempted, Categorized, Exhausted};
use super::validation::validate_request;
use crate::transport::{HttpReply, TransportError};
use crate::types::{GenerationRequest, GenerationResult};
use crate::{Error, ErrorContext, Result};

pub(crate) const GENERATE_PATH: &str = "/api/generate";

/// Why a single attempt failed.
#[derive(Debug)]
pub(crate) enum AttemptFailure {
    Transport(TransportError),
    Backend {
        status: u16,
        message: String,
        detail: Option<Value>,
    },
    Parse(String),
}

impl Categorized for AttemptFailure {
    fn category(&self) -> ErrorCategory {
        match self {
            AttemptFailure::Transport(e) => e.category(),
            AttemptFailure::Backend {
                status, message, ..
            } => ErrorCategory::BackendHttp {
                status: *status,
                body: message.clone(),
            },
            AttemptFailure::Parse(_) => ErrorCategory::Unknown,
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Transport(e) => write!(f, "{}", e),
            AttemptFailure::Backend {
                status, message, ..
            } => write!(f, "HTTP {}: {}", status, message),
            AttemptFailure::Parse(m) => write!(f, "{}", m),
        }
    }
}

impl AttemptFailure {
    pub(crate) fn into_error(self, category: ErrorCategory, context: ErrorContext) -> Error {
        match self {
            AttemptFailure::Transport(e) => Error::Transport {
                category,
                message: e.to_string(),
                context,
            },
            AttemptFailure::Backend {
                status,
                message,
                detail,
            } => Error::Backend {
                status,
                message,
                detail,
                context,
            },
            AttemptFailure::Parse(message) => Error::Parse { message, context },
        }
    }
}

/// Structured detail from a non-2xx body, falling back to the raw text.
pub(crate) fn backend_error_detail(body: &str) -> (String, Option<Value>) {
    let raw = body.trim();
    let parsed: Option<Value> = serde_json::from_str(raw).ok();
    let message = parsed.as_ref().and_then(|v| {
        ["detail", "error", "message"]
            .iter()
            .find_map(|key| match v.get(*key)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Null => None,
                Value::Object(inner) => inner
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| Some(Value::Object(inner.clone()).to_string())),
                other => Some(other.to_string()),
            })
    });
    let message = message.unwrap_or_else(|| {
        if raw.is_empty() {
            "empty response body".to_string()
        } else {
            raw.to_string()
        }
    });
    (message, parsed)
}

/// Parse a 2xx body. Non-JSON text is treated as the content itself unless
/// the response claimed to be JSON.
pub(crate) fn parse_success_body(reply: &HttpReply) -> std::result::Result<Value, AttemptFailure> {
    match serde_json::from_str::<Value>(reply.body.trim()) {
        Ok(v) => Ok(v),
        Err(e) if reply.declares_json() => Err(AttemptFailure::Parse(format!(
            "response declared JSON but could not be parsed: {}",
            e
        ))),
        Err(_) => Ok(json!({ "content": reply.body })),
    }
}

impl GatewayClient {
    /// Single POST attempt (no retry).
    pub(crate) async fn post_once(
        &self,
        payload: &Value,
        headers: &[(&str, String)],
        deadline: Duration,
    ) -> std::result::Result<Value, AttemptFailure> {
        let reply = self
            .transport
            .execute("POST", GENERATE_PATH, Some(payload), headers, deadline)
            .await
            .map_err(AttemptFailure::Transport)?;

        if !reply.is_success() {
            let (message, detail) = backend_error_detail(&reply.body);
            return Err(AttemptFailure::Backend {
                status: reply.status,
                message,
                detail,
            });
        }

        parse_success_body(&reply)
    }

    /// Submit one generation request and wait for the backend's answer.
    ///
    /// Missing identifiers fail with [`Error::Validation`] before any network
    /// call. Transient failures are retried per the client's [`RetryPolicy`](super::RetryPolicy).
    pub async fn submit(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        validate_request(request)?;

        let request_id = Uuid::new_v4().to_string();
        let payload = request.to_payload();
        let headers = [
            ("x-request-id", request_id.clone()),
            ("x-generation-mode", request.mode.as_str().to_string()),
        ];
        let deadline = request.timeout;
        let start = Instant::now();

        info!(
            request_id = %request_id,
            template = %request.template,
            style_profile = %request.style_profile,
            generation_mode = request.mode.as_str(),
            timeout_secs = deadline.as_secs(),
            "generation request started"
        );

        let payload_ref = &payload;
        let headers_ref = &headers[..];
        let outcome = self
            .policy
            .execute(move |attempt| async move {
                debug!(request_id = %headers_ref[0].1, attempt, "posting generation attempt");
                self.post_once(payload_ref, headers_ref, deadline).await
            })
            .await;
        let elapsed_ms = start.elapsed().as_millis();

        match outcome {
            Ok(Attempted { value, attempts }) => {
                let mut result = GenerationResult::from_backend(&value, None);
                result.success = true;
                let meta = &mut result.metadata;
                meta.insert("processing_time_ms".into(), json!(elapsed_ms as u64));
                meta.insert("attempts".into(), json!(attempts));
                meta.insert("request_id".into(), json!(request_id));
                meta.insert("generation_mode".into(), json!(request.mode.as_str()));
                meta.insert("template".into(), json!(request.template));
                meta.insert("style_profile".into(), json!(request.style_profile));

                if result.content.is_empty() {
                    warn!(
                        request_id = %request_id,
                        generation_id = %result.generation_id,
                        "backend response carried no recognizable content"
                    );
                }
                info!(
                    request_id = %request_id,
                    generation_id = %result.generation_id,
                    attempts,
                    duration_ms = elapsed_ms as u64,
                    content_chars = result.content.chars().count(),
                    "generation request succeeded"
                );
                Ok(result)
            }
            Err(Exhausted {
                error,
                category,
                attempts,
            }) => {
                warn!(
                    request_id = %request_id,
                    attempts,
                    category = category.as_str(),
                    duration_ms = elapsed_ms as u64,
                    error = %error,
                    "generation request failed"
                );
                let context = ErrorContext::new()
                    .with_source("gateway_submit")
                    .with_request_id(request_id)
                    .with_attempts(attempts)
                    .with_processing_time_ms(elapsed_ms);
                Err(error.into_error(category, context))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(content_type: Option<&str>, body: &str) -> HttpReply {
        HttpReply {
            status: 200,
            content_type: content_type.map(str::to_string),
            upstream_request_id: None,
            body: body.to_string(),
        }
    }

    #[test]
    fn plain_text_body_becomes_content() {
        let v = parse_success_body(&reply(Some("text/plain"), "Just the article")).unwrap();
        assert_eq!(v, json!({"content": "Just the article"}));
    }

    #[test]
    fn malformed_json_with_json_content_type_is_parse_error() {
        let err = parse_success_body(&reply(Some("application/json"), "{\"content\": ")).unwrap_err();
        assert!(matches!(err, AttemptFailure::Parse(_)));
        assert_eq!(err.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn backend_detail_prefers_structured_fields() {
        let (msg, detail) = backend_error_detail(r#"{"detail": "template not found"}"#);
        assert_eq!(msg, "template not found");
        assert!(detail.is_some());

        let (msg, _) = backend_error_detail(r#"{"error": {"message": "overloaded", "code": 503}}"#);
        assert_eq!(msg, "overloaded");

        let (msg, detail) = backend_error_detail("Bad Gateway");
        assert_eq!(msg, "Bad Gateway");
        assert!(detail.is_none());

        let (msg, _) = backend_error_detail("");
        assert_eq!(msg, "empty response body");
    }
}
