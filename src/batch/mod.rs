//! # Batch Coordinator
//!
//! Submits many generation requests concurrently and gathers their outcomes
//! positionally. One failing item never aborts the batch.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchCoordinator`] | Bounded-concurrency fan-out over a [`GenerationSubmitter`] |
//! | [`BatchStatus`] | Aggregate view: counts, per-index slots, item errors |
//! | [`BatchSlot`] | `Pending`, `Resolved` or `Failed` for one request |
//! | [`BatchTracker`] | Live handle to a batch spawned in the background |
//!
//! ## Example
//!
//! ```rust,no_run
//! use generation_gateway::{GatewayClient, GenerationRequest};
//!
//! # async fn run() -> generation_gateway::Result<()> {
//! let client = GatewayClient::from_env()?;
//! let status = client
//!     .submit_batch(vec![
//!         GenerationRequest::new("blog-post", "conversational"),
//!         GenerationRequest::new("newsletter", "formal"),
//!     ])
//!     .await;
//! println!("{}/{} completed", status.completed_count, status.total_count);
//! # Ok(())
//! # }
//! ```

mod coordinator;

pub use coordinator::{
    BatchCoordinator, BatchItemError, BatchSlot, BatchStatus, BatchTracker, GenerationSubmitter,
};
