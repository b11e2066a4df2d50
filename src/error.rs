use crate::client::error_classification::ErrorCategory;
use thiserror::Error;

/// Structured error context for callers that make their own retry or routing decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "request.template")
    pub field_path: Option<String>,
    /// Additional context about the error
    pub details: Option<String>,
    /// Component that raised the error (e.g., "request_validator", "gateway_submit")
    pub source: Option<String>,
    /// Correlation id sent as `X-Request-ID`
    pub request_id: Option<String>,
    /// Number of attempts made before giving up
    pub attempts: Option<u32>,
    /// Wall-clock time spent, including backoff
    pub processing_time_ms: Option<u128>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn with_processing_time_ms(mut self, ms: u128) -> Self {
        self.processing_time_ms = Some(ms);
        self
    }
}

/// Unified error type for the generation gateway.
///
/// Every failure a caller can observe is one of these variants; transport
/// failures have already been classified and retried per policy.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Transport error ({category}): {message}{}", format_context(.context))]
    Transport {
        category: ErrorCategory,
        message: String,
        context: ErrorContext,
    },

    #[error("Backend error: HTTP {status}: {message}{}", format_context(.context))]
    Backend {
        status: u16,
        message: String,
        detail: Option<serde_json::Value>,
        context: ErrorContext,
    },

    #[error("Malformed backend response: {message}{}", format_context(.context))]
    Parse {
        message: String,
        context: ErrorContext,
    },

    #[error("Progress channel for {generation_id} lost: {reason}")]
    ConnectionLost {
        generation_id: String,
        reason: String,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(ref id) = ctx.request_id {
        parts.push(format!("request_id: {}", id));
    }
    if let Some(attempts) = ctx.attempts {
        parts.push(format!("attempts: {}", attempts));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn parse_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Parse {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Transport { context, .. }
            | Error::Backend { context, .. }
            | Error::Parse { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Classifier category for transport and backend failures.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Error::Transport { category, .. } => Some(category.clone()),
            Error::Backend { status, message, .. } => Some(ErrorCategory::BackendHttp {
                status: *status,
                body: message.clone(),
            }),
            _ => None,
        }
    }

    /// Attempts made before this error was surfaced, if the error came out of the retry loop.
    pub fn attempts(&self) -> Option<u32> {
        self.context().and_then(|c| c.attempts)
    }

    /// HTTP-equivalent status an outer surface should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::Transport { category, .. } => match category {
                ErrorCategory::Timeout | ErrorCategory::Abort => 504,
                ErrorCategory::Network | ErrorCategory::Dns => 503,
                ErrorCategory::BackendHttp { status, .. } => *status,
                ErrorCategory::Ssl | ErrorCategory::Unknown => 502,
            },
            Error::Backend { status, .. } => *status,
            Error::Parse { .. } => 502,
            Error::ConnectionLost { .. } => 503,
            Error::Configuration { .. } | Error::Serialization(_) | Error::Io(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context_parts() {
        let err = Error::validation_with_context(
            "template is required",
            ErrorContext::new()
                .with_field_path("request.template")
                .with_source("request_validator"),
        );
        let text = err.to_string();
        assert!(text.contains("template is required"));
        assert!(text.contains("field: request.template"));
        assert!(text.contains("source: request_validator"));
    }

    #[test]
    fn http_status_follows_category() {
        let timeout = Error::Transport {
            category: ErrorCategory::Timeout,
            message: "deadline elapsed".into(),
            context: ErrorContext::new(),
        };
        let network = Error::Transport {
            category: ErrorCategory::Network,
            message: "connection refused".into(),
            context: ErrorContext::new(),
        };
        let backend = Error::Backend {
            status: 422,
            message: "bad template".into(),
            detail: None,
            context: ErrorContext::new().with_attempts(1),
        };
        assert_eq!(timeout.http_status(), 504);
        assert_eq!(network.http_status(), 503);
        assert_eq!(backend.http_status(), 422);
        assert_eq!(backend.attempts(), Some(1));
        assert_eq!(
            backend.category(),
            Some(ErrorCategory::BackendHttp {
                status: 422,
                body: "bad template".into()
            })
        );
    }
}
