//! Error classification logic

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of failure categories a retry decision is made on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Abort,
    Ssl,
    Dns,
    Unknown,
    /// Non-2xx answer from a reachable backend.
    BackendHttp { status: u16, body: String },
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Abort => "abort",
            ErrorCategory::Ssl => "ssl",
            ErrorCategory::Dns => "dns",
            ErrorCategory::Unknown => "unknown",
            ErrorCategory::BackendHttp { .. } => "backend_http",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::BackendHttp { status, .. } => write!(f, "backend_http {}", status),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Token table in priority order. The first row with any matching token wins.
const TOKEN_TABLE: &[(&[&str], ErrorCategory)] = &[
    (&["abort"], ErrorCategory::Abort),
    (&["timeout"], ErrorCategory::Timeout),
    (
        &[
            "network",
            "fetch",
            "econnrefused",
            "connection refused",
            "connection reset",
            "connection closed",
            "enotfound",
            "host not found",
            "etimedout",
            "timed out",
        ],
        ErrorCategory::Network,
    ),
    (&["ssl", "tls", "certificate"], ErrorCategory::Ssl),
    (&["dns", "resolve"], ErrorCategory::Dns),
];

/// Classify an error by its name and message tokens.
///
/// Case-insensitive substring match, priority Abort > Timeout > Network > SSL > DNS.
pub fn classify_text(name: &str, message: &str) -> ErrorCategory {
    let haystack = format!("{} {}", name, message).to_lowercase();
    for (tokens, category) in TOKEN_TABLE {
        if tokens.iter().any(|t| haystack.contains(t)) {
            return category.clone();
        }
    }
    ErrorCategory::Unknown
}

/// Classify any error, walking its full source chain.
pub fn classify(err: &(dyn std::error::Error + 'static)) -> ErrorCategory {
    let mut names = Vec::new();
    let mut messages = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(name) = name_hint(e) {
            names.push(name);
        }
        messages.push(message_text(e));
        current = e.source();
    }
    classify_text(&names.join(" "), &messages.join(": "))
}

/// Display text of one chain link. Request URLs are left out so a host or
/// path can never contribute tokens.
fn message_text(err: &(dyn std::error::Error + 'static)) -> String {
    let text = err.to_string();
    match err.downcast_ref::<reqwest::Error>().and_then(|e| e.url()) {
        Some(url) => text.replace(url.as_str(), ""),
        None => text,
    }
}

/// Synthetic error names for error types whose Display text alone is ambiguous.
///
/// A reqwest connect failure gets no name of its own: the chain below it
/// says whether it was DNS, TLS or a refused socket.
fn name_hint(err: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        return e.is_timeout().then_some("TimeoutError");
    }
    if let Some(e) = err.downcast_ref::<std::io::Error>() {
        use std::io::ErrorKind;
        return match e.kind() {
            ErrorKind::TimedOut => Some("TimeoutError"),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => Some("NetworkError"),
            _ => None,
        };
    }
    None
}
