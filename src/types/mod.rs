//! # Types Module
//!
//! Core value types that flow through the gateway.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GenerationRequest`] | Immutable submission value (template, style profile, parameters) |
//! | [`GenerationResult`] | Outcome of one completed attempt |
//! | [`GenerationProgress`] | Live lifecycle record for one generation id |
//! | [`AgentUpdate`] | One entry in the append-only agent audit trail |
//! | [`ChannelMessage`] | Tagged frames exchanged over the progress channel |
//!
//! ## Example
//!
//! ```rust
//! use generation_gateway::types::{GenerationMode, GenerationRequest, Priority};
//!
//! let request = GenerationRequest::new("blog-post", "conversational")
//!     .with_topic("Rust error handling")
//!     .with_parameter("audience", "backend engineers")
//!     .with_priority(Priority::High)
//!     .with_mode(GenerationMode::Streaming);
//! assert_eq!(request.template, "blog-post");
//! ```

pub mod events;
pub mod progress;
pub mod request;
pub mod result;

pub use events::ChannelMessage;
pub use progress::{AgentUpdate, ConnectionStatus, GenerationProgress, GenerationState};
pub use request::{GenerationMode, GenerationRequest, Priority};
pub use result::{GenerationResult, IdSource};
