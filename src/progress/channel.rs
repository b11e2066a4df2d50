use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{ChannelConnector, ChannelLink, InboundFrame};
use crate::types::events::value_text;
use crate::types::{
    AgentUpdate, ChannelMessage, ConnectionStatus, GenerationProgress, GenerationResult,
    GenerationState,
};
use crate::{Error, Result};

const MAX_AGENT_RESULT_CHARS: usize = 500;
const MIN_PING_INTERVAL: Duration = Duration::from_millis(10);

/// What a progress subscriber is told, in channel delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status {
        state: GenerationState,
        progress: u8,
        current_step: Option<String>,
    },
    Agent(AgentUpdate),
    Completed(GenerationResult),
    Failed(String),
    Cancelled,
    /// The peer went away before a terminal state. Not a generation failure.
    ConnectionLost { reason: Option<String> },
}

type UpdateCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

enum Command {
    Subscribe(UpdateCallback),
    Cancel(oneshot::Sender<GenerationState>),
    Close,
}

/// Opens progress channels through a [`ChannelConnector`].
#[derive(Clone)]
pub struct ProgressChannel {
    connector: Arc<dyn ChannelConnector>,
    ping_interval: Duration,
}

impl ProgressChannel {
    /// Intervals below 10 ms are raised to 10 ms.
    pub fn new(connector: Arc<dyn ChannelConnector>, ping_interval: Duration) -> Self {
        Self {
            connector,
            ping_interval: ping_interval.max(MIN_PING_INTERVAL),
        }
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Connect and start the task that owns this generation's record.
    pub async fn open(&self, generation_id: &str) -> Result<ProgressHandle> {
        let link = self.connector.connect(generation_id).await?;
        let mut initial = GenerationProgress::new(generation_id);
        initial.connection = ConnectionStatus::Open;
        let (state_tx, state_rx) = watch::channel(initial);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let task = ChannelTask {
            generation_id: generation_id.to_string(),
            link,
            commands: cmd_rx,
            state: state_tx,
            callbacks: Vec::new(),
            ping_interval: self.ping_interval,
        };
        let join = tokio::spawn(task.run());
        info!(generation_id, "progress channel opened");

        Ok(ProgressHandle {
            generation_id: generation_id.to_string(),
            commands: cmd_tx,
            snapshots: state_rx,
            task: join,
        })
    }
}

/// Caller side of an open progress channel.
///
/// Dropping the handle closes the channel.
pub struct ProgressHandle {
    generation_id: String,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<GenerationProgress>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("generation_id", &self.generation_id)
            .field("state", &self.state())
            .finish()
    }
}

impl ProgressHandle {
    pub fn generation_id(&self) -> &str {
        &self.generation_id
    }

    /// Register a callback for subsequent events. Events delivered before
    /// registration are not replayed; read [`snapshot`](Self::snapshot) for those.
    pub fn on_update<F>(&self, callback: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let _ = self.commands.send(Command::Subscribe(Box::new(callback)));
    }

    pub fn snapshot(&self) -> GenerationProgress {
        self.snapshots.borrow().clone()
    }

    pub fn state(&self) -> GenerationState {
        self.snapshots.borrow().state
    }

    /// Wait until the generation is terminal or the connection has ended.
    pub async fn wait(&self) -> GenerationProgress {
        let mut rx = self.snapshots.clone();
        let done = rx
            .wait_for(|p| p.state.is_terminal() || p.connection != ConnectionStatus::Open)
            .await
            .map(|p| (*p).clone());
        match done {
            Ok(p) => p,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Like [`wait`](Self::wait), but a channel that ends before a terminal
    /// state is reported as [`Error::ConnectionLost`]. The generation itself
    /// may still finish on the backend; poll it with `GatewayClient::status`.
    pub async fn wait_terminal(&self) -> Result<GenerationProgress> {
        let progress = self.wait().await;
        if progress.state.is_terminal() {
            return Ok(progress);
        }
        let reason = match progress.connection {
            ConnectionStatus::Lost => "peer closed before a terminal state",
            _ => "channel closed before a terminal state",
        };
        Err(Error::ConnectionLost {
            generation_id: self.generation_id.clone(),
            reason: reason.to_string(),
        })
    }

    /// Cancel the generation. Local bookkeeping stops at once; the backend is
    /// notified best-effort. Returns the resulting state (a terminal state
    /// reached earlier is kept).
    pub async fn cancel(&self) -> GenerationState {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Cancel(ack_tx)).is_err() {
            return self.state();
        }
        ack_rx.await.unwrap_or_else(|_| self.state())
    }

    /// Close the channel without changing the lifecycle state.
    pub async fn close(self) -> GenerationProgress {
        let _ = self.commands.send(Command::Close);
        let _ = self.task.await;
        let snapshot = self.snapshots.borrow().clone();
        snapshot
    }
}

struct ChannelTask {
    generation_id: String,
    link: ChannelLink,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<GenerationProgress>,
    callbacks: Vec<UpdateCallback>,
    ping_interval: Duration,
}

impl ChannelTask {
    async fn run(mut self) {
        let mut ping = tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Subscribe(cb)) => self.callbacks.push(cb),
                    Some(Command::Cancel(ack)) => {
                        self.cancel();
                        let _ = ack.send(self.state.borrow().state);
                        break;
                    }
                    Some(Command::Close) | None => {
                        self.set_connection(ConnectionStatus::Closed);
                        debug!(generation_id = %self.generation_id, "progress channel closed by caller");
                        break;
                    }
                },

                frame = self.link.inbound.recv() => match frame {
                    Some(InboundFrame::Text(text)) => {
                        if self.handle_text(&text) {
                            self.set_connection(ConnectionStatus::Closed);
                            break;
                        }
                    }
                    Some(InboundFrame::Closed(reason)) => {
                        if self.peer_closed(reason) {
                            self.serve_commands().await;
                        }
                        break;
                    }
                    None => {
                        if self.peer_closed(None) {
                            self.serve_commands().await;
                        }
                        break;
                    }
                },

                _ = ping.tick() => {
                    self.send(ChannelMessage::Ping);
                }
            }
        }
    }

    /// After the peer is gone the record stays owned here, so the caller can
    /// still subscribe, cancel or close.
    async fn serve_commands(&mut self) {
        while let Some(cmd) = self.commands.recv().await {
            match cmd {
                Command::Subscribe(cb) => self.callbacks.push(cb),
                Command::Cancel(ack) => {
                    self.cancel();
                    let _ = ack.send(self.state.borrow().state);
                    return;
                }
                Command::Close => {
                    self.set_connection(ConnectionStatus::Closed);
                    return;
                }
            }
        }
    }

    fn emit(&self, event: ProgressEvent) {
        for cb in &self.callbacks {
            cb(&event);
        }
    }

    /// Queue an outbound frame without blocking the loop.
    fn send(&self, msg: ChannelMessage) {
        if let Err(e) = self.link.outbound.try_send(msg.to_text()) {
            debug!(generation_id = %self.generation_id, error = %e, "progress frame not sent");
        }
    }

    fn set_connection(&self, status: ConnectionStatus) {
        self.state.send_modify(|p| p.connection = status);
    }

    /// Apply one frame. Returns true once a terminal state is reached.
    fn handle_text(&mut self, text: &str) -> bool {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                debug!(generation_id = %self.generation_id, error = %e, "ignoring malformed progress frame");
                return false;
            }
        };
        let msg: ChannelMessage = match serde_json::from_value(value.clone()) {
            Ok(m) => m,
            Err(e) => {
                debug!(generation_id = %self.generation_id, error = %e, "ignoring undecodable progress frame");
                return false;
            }
        };

        match msg {
            ChannelMessage::StatusUpdate {
                status,
                progress,
                current_step,
                ..
            } => {
                self.state
                    .send_modify(|p| p.apply_status(status, progress, current_step));
                let p = self.state.borrow().clone();
                self.emit(ProgressEvent::Status {
                    state: p.state,
                    progress: p.progress,
                    current_step: p.current_step,
                });
                false
            }
            ChannelMessage::AgentUpdate {
                agent,
                action,
                timestamp,
                result,
            } => {
                let update = AgentUpdate {
                    agent,
                    action,
                    timestamp: timestamp
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
                    result: result
                        .as_ref()
                        .and_then(value_text)
                        .map(|t| t.chars().take(MAX_AGENT_RESULT_CHARS).collect()),
                };
                self.state
                    .send_modify(|p| p.push_agent_update(update.clone()));
                self.emit(ProgressEvent::Agent(update));
                false
            }
            ChannelMessage::Completion { result } => {
                let payload = if result.is_null() { &value } else { &result };
                let parsed = GenerationResult::from_backend(payload, Some(&self.generation_id));
                info!(
                    generation_id = %self.generation_id,
                    content_chars = parsed.content.chars().count(),
                    "generation completed"
                );
                // Subscribers hear about a terminal state before waiters see it.
                self.emit(ProgressEvent::Completed(parsed.clone()));
                self.state.send_modify(|p| p.complete(parsed));
                true
            }
            ChannelMessage::Error { error } => {
                let message =
                    value_text(&error).unwrap_or_else(|| "generation failed".to_string());
                warn!(generation_id = %self.generation_id, error = %message, "generation failed");
                self.emit(ProgressEvent::Failed(message.clone()));
                self.state.send_modify(|p| p.fail(message));
                true
            }
            ChannelMessage::Ping => {
                self.send(ChannelMessage::Pong);
                false
            }
            ChannelMessage::Pong => {
                debug!(generation_id = %self.generation_id, "pong");
                false
            }
            ChannelMessage::Cancel { .. } | ChannelMessage::Unknown => false,
        }
    }

    fn cancel(&mut self) {
        let mut changed = false;
        self.state.send_modify(|p| {
            changed = p.cancel();
            p.connection = ConnectionStatus::Closed;
        });
        if changed {
            self.send(ChannelMessage::Cancel {
                generation_id: self.generation_id.clone(),
            });
            info!(generation_id = %self.generation_id, "generation cancelled");
            self.emit(ProgressEvent::Cancelled);
        }
    }

    /// Returns true when the peer left before a terminal state.
    fn peer_closed(&mut self, reason: Option<String>) -> bool {
        let terminal = self.state.borrow().state.is_terminal();
        if terminal {
            self.set_connection(ConnectionStatus::Closed);
            return false;
        }
        warn!(
            generation_id = %self.generation_id,
            reason = reason.as_deref().unwrap_or("closed"),
            "progress channel lost before completion"
        );
        self.emit(ProgressEvent::ConnectionLost { reason });
        self.set_connection(ConnectionStatus::Lost);
        true
    }
}
