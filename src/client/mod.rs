//! # Gateway Client
//!
//! Submits generation requests to the backend and follows their lifecycle.
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | [`GatewayClient::submit`] | Validate, assemble payload, POST with retries, normalize |
//! | [`GatewayClient::submit_tracked`] | `submit`, then open a progress channel for async modes |
//! | [`GatewayClient::status`] | Poll status with positional endpoint fallbacks |
//! | [`GatewayClient::cancel`] | Best-effort backend cancel |
//! | [`GatewayClient::open_progress`] | Open a progress channel for an existing id |
//! | [`GatewayClient::submit_batch`] | Fan a list of requests out concurrently |

mod builder;
mod core;
pub mod error_classification;
mod execution;
pub mod policy;
mod status;
mod validation;

pub use builder::GatewayClientBuilder;
pub use core::{GatewayClient, Submission};
pub use error_classification::{classify, classify_text, ErrorCategory};
pub use policy::{Attempted, Categorized, Decision, Exhausted, RetryPolicy, Sleeper, TokioSleeper};
pub use status::{CancelAck, StatusSnapshot};
