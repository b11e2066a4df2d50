//! Status polling and cancellation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::core::GatewayClient;
use super::execution::{backend_error_detail, parse_success_body, AttemptFailure};
use super::policy::Categorized;
use super::validation::validate_generation_id;
use crate::normalize;
use crate::types::result::{progress_percent, resolve_generation_id};
use crate::types::GenerationState;
use crate::{Error, ErrorContext, Result};

/// Point-in-time view of a generation as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub generation_id: String,
    pub state: GenerationState,
    pub progress: Option<u8>,
    pub content: String,
    /// Path of the endpoint that answered.
    pub endpoint: String,
    pub raw: Value,
}

impl StatusSnapshot {
    pub(crate) fn from_backend(generation_id: &str, raw: Value, endpoint: String) -> Self {
        let content = normalize::extract(&raw);
        let state = match raw.get("status").and_then(Value::as_str) {
            Some(status) => GenerationState::from_backend_status(status),
            None if !content.is_empty() => GenerationState::Completed,
            None => GenerationState::Processing,
        };
        let (generation_id, _) = resolve_generation_id(&raw, Some(generation_id));
        Self {
            generation_id,
            state,
            progress: progress_percent(&raw),
            content,
            endpoint,
            raw,
        }
    }
}

/// Outcome of a cancel call. Cancellation is best effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    pub generation_id: String,
    /// Whether the backend answered the cancel with a 2xx.
    pub backend_acknowledged: bool,
}

fn status_endpoints(id: &str) -> [String; 3] {
    [
        format!("/api/status/{}", id),
        format!("/api/generation/{}", id),
        format!("/status?generation_id={}", id),
    ]
}

impl GatewayClient {
    async fn get_once(&self, path: &str, request_id: &str) -> std::result::Result<Value, AttemptFailure> {
        let headers = [("x-request-id", request_id.to_string())];
        let reply = self
            .transport
            .execute("GET", path, None, &headers, self.config.default_timeout())
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

    /// Current status of a generation.
    ///
    /// Endpoints are tried in order; the first 2xx answer is authoritative. When
    /// none answers, the last failure is returned.
    pub async fn status(&self, generation_id: &str) -> Result<StatusSnapshot> {
        validate_generation_id(generation_id)?;
        let request_id = Uuid::new_v4().to_string();

        let mut last: Option<AttemptFailure> = None;
        for path in status_endpoints(generation_id) {
            match self.get_once(&path, &request_id).await {
                Ok(raw) => {
                    debug!(generation_id, endpoint = %path, "status endpoint answered");
                    return Ok(StatusSnapshot::from_backend(generation_id, raw, path));
                }
                Err(e) => {
                    debug!(generation_id, endpoint = %path, error = %e, "status endpoint failed");
                    last = Some(e);
                }
            }
        }

        let context = ErrorContext::new()
            .with_source("gateway_status")
            .with_request_id(request_id)
            .with_attempts(3);
        match last {
            Some(failure) => {
                let category = failure.category();
                Err(failure.into_error(category, context))
            }
            None => Err(Error::parse_with_context("no status endpoint answered", context)),
        }
    }

    /// Ask the backend to stop a generation. Never fails; failures only clear
    /// [`CancelAck::backend_acknowledged`]. The backend may still finish the work.
    pub async fn cancel(&self, generation_id: &str) -> CancelAck {
        let mut ack = CancelAck {
            generation_id: generation_id.to_string(),
            backend_acknowledged: false,
        };
        if let Err(e) = validate_generation_id(generation_id) {
            warn!(generation_id, error = %e, "cancel skipped");
            return ack;
        }

        let path = format!("/api/generation/{}", generation_id);
        let headers = [("x-request-id", Uuid::new_v4().to_string())];
        match self
            .transport
            .execute("DELETE", &path, None, &headers, self.config.default_timeout())
            .await
        {
            Ok(reply) if reply.is_success() => {
                info!(generation_id, "generation cancel acknowledged");
                ack.backend_acknowledged = true;
            }
            Ok(reply) => {
                warn!(generation_id, http_status = reply.status, "backend refused cancel");
            }
            Err(e) => {
                warn!(generation_id, error = %e, "cancel request failed");
            }
        }
        ack
    }
}
