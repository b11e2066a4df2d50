use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error_classification::ErrorCategory;

/// Decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Errors the retry loop can reason about.
pub trait Categorized {
    fn category(&self) -> ErrorCategory;
}

/// The waiting primitive used between attempts. Injected so tests never sleep.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Default sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Successful outcome of the retry loop.
#[derive(Debug, Clone)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Terminal failure of the retry loop: the last error, tagged.
#[derive(Debug, Clone)]
pub struct Exhausted<E> {
    pub error: E,
    pub category: ErrorCategory,
    pub attempts: u32,
}

/// Bounded retry with attempt-indexed exponential backoff.
///
/// - Abort and Timeout stop at once (a deadline or a cancel was already enforced)
/// - Network retries after `base_delay * 2^attempt`
/// - BackendHttp retries like Network for 5xx only
/// - Ssl, Dns and Unknown stop at once
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Delay inserted after the failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Decide what to do after attempt `attempt` (1-based) failed with `category`.
    pub fn decide(&self, category: &ErrorCategory, attempt: u32) -> Decision {
        let retryable = match category {
            ErrorCategory::Network => true,
            ErrorCategory::BackendHttp { status, .. } => *status >= 500,
            ErrorCategory::Abort
            | ErrorCategory::Timeout
            | ErrorCategory::Ssl
            | ErrorCategory::Dns
            | ErrorCategory::Unknown => false,
        };
        if retryable && attempt < self.max_attempts {
            Decision::Retry {
                delay: self.backoff_delay(attempt),
            }
        } else {
            Decision::Fail
        }
    }

    /// Run `attempt_fn` until it succeeds or the policy gives up.
    ///
    /// `attempt_fn` receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, mut attempt_fn: F) -> Result<Attempted<T>, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Categorized + std::fmt::Display,
    {
        let mut attempt = 1u32;
        loop {
            match attempt_fn(attempt).await {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    })
                }
                Err(error) => {
                    let category = error.category();
                    match self.decide(&category, attempt) {
                        Decision::Retry { delay } => {
                            tracing::warn!(
                                attempt,
                                max_attempts = self.max_attempts,
                                category = category.as_str(),
                                delay_ms = delay.as_millis() as u64,
                                error = %error,
                                "generation attempt failed, retrying"
                            );
                            self.sleeper.sleep(delay).await;
                            attempt += 1;
                        }
                        Decision::Fail => {
                            return Err(Exhausted {
                                error,
                                category,
                                attempts: attempt,
                            })
                        }
                    }
                }
            }
        }
    }
}
