//! # Progress Channel
//!
//! One persistent connection per generation id, owned by a single task that
//! consumes backend frames and caller commands and is the only writer of that
//! id's [`GenerationProgress`]. Callers hold a [`ProgressHandle`] and observe
//! cloned snapshots.
//!
//! | Frame | Effect |
//! |-------|--------|
//! | `status_update` | `Queued -> Processing`, progress and step updated |
//! | `agent_update` | [`AgentUpdate`](crate::types::AgentUpdate) appended |
//! | `completion` | `-> Completed`, result attached |
//! | `error` | `-> Error`, message attached |
//! | `ping` | answered with `pong` |
//! | `pong` / unknown | ignored |
//!
//! A keep-alive `ping` is sent every `ping_interval` while the channel is open.
//! If the peer goes away before a terminal state the record is marked
//! [`ConnectionStatus::Lost`](crate::types::ConnectionStatus::Lost) and [`ProgressEvent::ConnectionLost`] is emitted;
//! the generation is never resubmitted.

mod channel;

pub use channel::{ProgressChannel, ProgressEvent, ProgressHandle};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// One frame delivered by a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    /// The peer closed or the connection failed.
    Closed(Option<String>),
}

/// Both directions of an established channel.
///
/// Dropping `outbound` asks the connector to close the connection.
#[derive(Debug)]
pub struct ChannelLink {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<InboundFrame>,
}

/// Establishes the persistent channel for a generation id.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, generation_id: &str) -> Result<ChannelLink>;
}
