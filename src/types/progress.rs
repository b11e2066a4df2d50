//! Lifecycle record for one in-flight generation.

use serde::{Deserialize, Serialize};

use super::result::GenerationResult;

/// Lifecycle state of a generation.
///
/// `Queued -> Processing -> Completed | Error`, and any non-terminal state `-> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    #[default]
    Queued,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationState::Completed | GenerationState::Error | GenerationState::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: GenerationState) -> bool {
        use GenerationState::*;
        match (*self, next) {
            (s, _) if s.is_terminal() => false,
            (Queued, Processing) => true,
            (Processing, Processing) => true,
            (Queued | Processing, Completed | Error | Cancelled) => true,
            _ => false,
        }
    }

    /// Map a free-form backend status string (used by status polling).
    pub fn from_backend_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" | "succeeded" | "success" => {
                GenerationState::Completed
            }
            "error" | "failed" | "failure" => GenerationState::Error,
            "cancelled" | "canceled" => GenerationState::Cancelled,
            "queued" | "pending" | "submitted" | "" => GenerationState::Queued,
            _ => GenerationState::Processing,
        }
    }
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GenerationState::Queued => "queued",
            GenerationState::Processing => "processing",
            GenerationState::Completed => "completed",
            GenerationState::Error => "error",
            GenerationState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// State of the underlying progress connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Open,
    /// Closed locally or after a terminal state.
    Closed,
    /// Dropped by the peer before a terminal state.
    Lost,
}

/// One agent handoff reported by the backend pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentUpdate {
    pub agent: String,
    pub action: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub generation_id: String,
    pub state: GenerationState,
    pub progress: u8,
    pub current_step: Option<String>,
    /// Append-only, in delivery order.
    pub agent_updates: Vec<AgentUpdate>,
    pub result: Option<GenerationResult>,
    pub error: Option<String>,
    pub connection: ConnectionStatus,
    pub backend_status: Option<String>,
}

impl GenerationProgress {
    pub fn new(generation_id: impl Into<String>) -> Self {
        Self {
            generation_id: generation_id.into(),
            ..Self::default()
        }
    }

    /// Move to `next` if the state machine allows it. Returns whether the state changed.
    pub(crate) fn transition(&mut self, next: GenerationState) -> bool {
        if self.state.can_transition_to(next) && self.state != next {
            self.state = next;
            true
        } else {
            false
        }
    }

    pub(crate) fn apply_status(
        &mut self,
        status: Option<String>,
        progress: Option<f64>,
        step: Option<String>,
    ) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(GenerationState::Processing);
        if let Some(p) = progress {
            self.progress = p.clamp(0.0, 100.0).round() as u8;
        }
        if step.is_some() {
            self.current_step = step;
        }
        if status.is_some() {
            self.backend_status = status;
        }
    }

    pub(crate) fn push_agent_update(&mut self, update: AgentUpdate) {
        if !self.state.is_terminal() {
            self.agent_updates.push(update);
        }
    }

    pub(crate) fn complete(&mut self, result: GenerationResult) {
        if self.transition(GenerationState::Completed) {
            self.progress = 100;
            self.result = Some(result);
        }
    }

    pub(crate) fn fail(&mut self, message: String) {
        if self.transition(GenerationState::Error) {
            self.error = Some(message);
        }
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.transition(GenerationState::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_never_transition() {
        for terminal in [
            GenerationState::Completed,
            GenerationState::Error,
            GenerationState::Cancelled,
        ] {
            for next in [
                GenerationState::Queued,
                GenerationState::Processing,
                GenerationState::Completed,
                GenerationState::Error,
                GenerationState::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_update_moves_to_processing_and_clamps() {
        let mut p = GenerationProgress::new("g1");
        p.apply_status(Some("running".into()), Some(-4.0), Some("outline".into()));
        assert_eq!(p.state, GenerationState::Processing);
        assert_eq!(p.progress, 0);
        assert_eq!(p.current_step.as_deref(), Some("outline"));
        p.apply_status(None, Some(250.0), None);
        assert_eq!(p.progress, 100);
        assert_eq!(p.current_step.as_deref(), Some("outline"));
    }

    #[test]
    fn cancel_freezes_the_record() {
        let mut p = GenerationProgress::new("g1");
        p.apply_status(None, Some(30.0), None);
        assert!(p.cancel());
        p.apply_status(None, Some(90.0), None);
        p.fail("late".into());
        assert_eq!(p.state, GenerationState::Cancelled);
        assert_eq!(p.progress, 30);
        assert!(p.error.is_none());
    }

    #[test]
    fn backend_status_strings() {
        assert_eq!(
            GenerationState::from_backend_status("Done"),
            GenerationState::Completed
        );
        assert_eq!(
            GenerationState::from_backend_status("drafting"),
            GenerationState::Processing
        );
        assert_eq!(
            GenerationState::from_backend_status("pending"),
            GenerationState::Queued
        );
    }
}
