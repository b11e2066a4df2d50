//! Batch coordinator.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{ErrorCategory, GatewayClient};
use crate::types::{GenerationRequest, GenerationResult};
use crate::Result;

/// Anything that can run one generation to completion.
#[async_trait]
pub trait GenerationSubmitter: Send + Sync {
    async fn submit_generation(&self, request: &GenerationRequest) -> Result<GenerationResult>;
}

#[async_trait]
impl GenerationSubmitter for GatewayClient {
    async fn submit_generation(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.submit(request).await
    }
}

/// Outcome slot for one request, positionally aligned with the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum BatchSlot {
    Pending,
    Resolved(GenerationResult),
    Failed(String),
}

impl BatchSlot {
    pub fn is_pending(&self) -> bool {
        matches!(self, BatchSlot::Pending)
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            BatchSlot::Resolved(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub index: usize,
    pub message: String,
    pub category: Option<ErrorCategory>,
}

impl std::fmt::Display for BatchItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Batch error at {}: {}", self.index, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub completed_count: usize,
    pub total_count: usize,
    pub results: Vec<BatchSlot>,
    pub errors: Vec<BatchItemError>,
}

impl BatchStatus {
    pub fn new(total: usize) -> Self {
        Self {
            completed_count: 0,
            total_count: total,
            results: vec![BatchSlot::Pending; total],
            errors: Vec::new(),
        }
    }

    /// No slot is pending.
    pub fn is_terminal(&self) -> bool {
        self.results.iter().all(|s| !s.is_pending())
    }

    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }

    fn record(&mut self, index: usize, outcome: Result<GenerationResult>) {
        let Some(slot) = self.results.get_mut(index) else {
            return;
        };
        match outcome {
            Ok(result) => {
                *slot = BatchSlot::Resolved(result);
                self.completed_count += 1;
            }
            Err(e) => {
                let message = e.to_string();
                *slot = BatchSlot::Failed(message.clone());
                self.errors.push(BatchItemError {
                    index,
                    message,
                    category: e.category(),
                });
            }
        }
    }
}

/// Submits many requests concurrently, never letting one failure abort the rest.
pub struct BatchCoordinator<S: ?Sized> {
    submitter: Arc<S>,
    max_concurrency: usize,
}

impl<S> BatchCoordinator<S>
where
    S: GenerationSubmitter + ?Sized + 'static,
{
    pub fn new(submitter: Arc<S>) -> Self {
        Self {
            submitter,
            max_concurrency: 5,
        }
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Submit every request and wait until each slot is resolved or failed.
    pub async fn submit_batch(&self, requests: Vec<GenerationRequest>) -> BatchStatus {
        let (tx, _rx) = watch::channel(BatchStatus::new(requests.len()));
        run_batch(self.submitter.clone(), self.max_concurrency, requests, tx).await
    }

    /// Run the batch in the background; the tracker exposes live progress.
    pub fn spawn_batch(&self, requests: Vec<GenerationRequest>) -> BatchTracker {
        let (tx, rx) = watch::channel(BatchStatus::new(requests.len()));
        let submitter = self.submitter.clone();
        let max_concurrency = self.max_concurrency;
        let task = tokio::spawn(async move {
            run_batch(submitter, max_concurrency, requests, tx).await;
        });
        BatchTracker { rx, task }
    }
}

async fn run_batch<S>(
    submitter: Arc<S>,
    max_concurrency: usize,
    requests: Vec<GenerationRequest>,
    tx: watch::Sender<BatchStatus>,
) -> BatchStatus
where
    S: GenerationSubmitter + ?Sized,
{
    let start = Instant::now();
    let total = requests.len();
    info!(total, max_concurrency, "batch started");

    let mut outcomes = stream::iter(requests.into_iter().enumerate())
        .map(|(index, request)| {
            let submitter = submitter.clone();
            async move {
                let outcome = submitter.submit_generation(&request).await;
                (index, outcome)
            }
        })
        .buffer_unordered(max_concurrency);

    while let Some((index, outcome)) = outcomes.next().await {
        if let Err(e) = &outcome {
            warn!(index, error = %e, "batch item failed");
        } else {
            debug!(index, "batch item resolved");
        }
        tx.send_modify(|status| status.record(index, outcome));
    }

    let status = tx.borrow().clone();
    info!(
        total,
        completed = status.completed_count,
        failed = status.failed_count(),
        duration_ms = start.elapsed().as_millis() as u64,
        "batch finished"
    );
    status
}

/// Handle to a batch running in the background.
#[derive(Debug)]
pub struct BatchTracker {
    rx: watch::Receiver<BatchStatus>,
    task: JoinHandle<()>,
}

impl BatchTracker {
    /// Current snapshot; pending slots are still in flight.
    pub fn status(&self) -> BatchStatus {
        self.rx.borrow().clone()
    }

    /// Wait for every slot to leave `Pending`.
    pub async fn wait(mut self) -> BatchStatus {
        if let Ok(status) = self.rx.wait_for(BatchStatus::is_terminal).await {
            return status.clone();
        }
        // The task ended without publishing a terminal status (panicked or aborted).
        let _ = (&mut self.task).await;
        self.rx.borrow().clone()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl GenerationSubmitter for Scripted {
        async fn submit_generation(&self, request: &GenerationRequest) -> Result<GenerationResult> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if request.template == "broken" {
                return Err(Error::validation_with_context(
                    "template is required",
                    crate::ErrorContext::new(),
                ));
            }
            Ok(GenerationResult {
                success: true,
                generation_id: format!("gen-{}", request.template),
                content: request.template.clone(),
                metadata: Default::default(),
                error: None,
                progress: None,
            })
        }
    }

    fn scripted() -> Arc<Scripted> {
        Arc::new(Scripted {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn failures_stay_in_their_slot() {
        let coordinator = BatchCoordinator::new(scripted());
        let status = coordinator
            .submit_batch(vec![
                GenerationRequest::new("a", "s"),
                GenerationRequest::new("broken", "s"),
                GenerationRequest::new("c", "s"),
            ])
            .await;
        assert!(status.is_terminal());
        assert_eq!(status.total_count, 3);
        assert_eq!(status.completed_count, 2);
        assert_eq!(status.results[0].result().map(|r| r.content.as_str()), Some("a"));
        assert!(matches!(status.results[1], BatchSlot::Failed(_)));
        assert_eq!(status.results[2].result().map(|r| r.content.as_str()), Some("c"));
        assert_eq!(status.errors.len(), 1);
        assert_eq!(status.errors[0].index, 1);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let submitter = scripted();
        let coordinator = BatchCoordinator::new(submitter.clone()).with_max_concurrency(2);
        let requests = (0..8)
            .map(|i| GenerationRequest::new(format!("t{}", i), "s"))
            .collect();
        let status = coordinator.submit_batch(requests).await;
        assert_eq!(status.completed_count, 8);
        assert!(submitter.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_batch_is_terminal() {
        let status = BatchCoordinator::new(scripted()).submit_batch(Vec::new()).await;
        assert!(status.is_terminal());
        assert_eq!(status.total_count, 0);
    }

    #[tokio::test]
    async fn tracker_reports_final_status() {
        let tracker = BatchCoordinator::new(scripted()).spawn_batch(vec![
            GenerationRequest::new("a", "s"),
            GenerationRequest::new("broken", "s"),
        ]);
        assert_eq!(tracker.status().total_count, 2);
        let status = tracker.wait().await;
        assert!(status.is_terminal());
        assert_eq!(status.completed_count, 1);
        assert_eq!(status.failed_count(), 1);
    }
}
