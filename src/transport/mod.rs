//! Network transports: HTTP to the generation backend, WebSocket for progress.

pub mod http;
pub mod websocket;

pub use http::{HttpReply, HttpTransport};
pub use websocket::WebSocketConnector;

use crate::client::error_classification::{classify, ErrorCategory};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connect timeout after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransportError::ConnectTimeout(_) => ErrorCategory::Timeout,
            other => classify(other),
        }
    }
}
