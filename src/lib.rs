//! # generation-gateway
//!
//! Client-side gateway to an AI content-generation backend.
//!
//! ## Overview
//!
//! A caller describes a generation (template, style profile, free-form
//! parameters) and the gateway submits it over HTTP, retries transient
//! failures, normalizes whatever shape the backend answers with into plain
//! text, and optionally follows the generation's lifecycle over a WebSocket
//! progress channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use generation_gateway::{GatewayClient, GenerationMode, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> generation_gateway::Result<()> {
//!     let client = GatewayClient::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!
//!     let request = GenerationRequest::new("blog-post", "conversational")
//!         .with_topic("Rust error handling")
//!         .with_mode(GenerationMode::Async);
//!
//!     let submission = client.submit_tracked(&request).await?;
//!     if let Some(progress) = submission.progress {
//!         let finished = progress.wait().await;
//!         println!("{} -> {}", finished.generation_id, finished.state);
//!     } else {
//!         println!("{}", submission.result.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Gateway client, error classification, retry policy |
//! | [`normalize`] | Content extraction from heterogeneous backend payloads |
//! | [`progress`] | Per-generation progress channel and lifecycle record |
//! | [`batch`] | Concurrent batch submission |
//! | [`transport`] | HTTP and WebSocket plumbing |
//! | [`types`] | Requests, results, progress records, channel frames |
//! | [`config`] | Configuration from environment or YAML |

pub mod batch;
pub mod client;
pub mod config;
pub mod normalize;
pub mod progress;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchCoordinator, BatchSlot, BatchStatus, BatchTracker};
pub use client::{
    CancelAck, ErrorCategory, GatewayClient, GatewayClientBuilder, RetryPolicy, StatusSnapshot,
    Submission,
};
pub use config::GatewayConfig;
pub use progress::{ProgressChannel, ProgressEvent, ProgressHandle};
pub use types::{
    AgentUpdate, ChannelMessage, ConnectionStatus, GenerationMode, GenerationProgress,
    GenerationRequest, GenerationResult, GenerationState, Priority,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
