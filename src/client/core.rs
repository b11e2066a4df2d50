use std::sync::Arc;
use tracing::warn;

use crate::batch::{BatchCoordinator, BatchStatus};
use crate::client::policy::RetryPolicy;
use crate::config::GatewayConfig;
use crate::progress::{ProgressChannel, ProgressHandle};
use crate::transport::HttpTransport;
use crate::types::{GenerationRequest, GenerationResult};
use crate::{Error, Result};

use super::validation::validate_generation_id;

/// Client for the generation backend.
///
/// Cheap to clone; clones share the HTTP connection pool and configuration.
#[derive(Clone)]
pub struct GatewayClient {
    pub(crate) config: Arc<GatewayConfig>,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) policy: RetryPolicy,
    pub(crate) progress: ProgressChannel,
}

/// Result of [`GatewayClient::submit_tracked`].
#[derive(Debug)]
pub struct Submission {
    pub result: GenerationResult,
    /// Open channel for async and streaming modes.
    pub progress: Option<ProgressHandle>,
    /// Why the channel could not be opened. The submission itself succeeded.
    pub channel_error: Option<Error>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.transport.base_url())
            .field("policy", &self.policy)
            .finish()
    }
}

impl GatewayClient {
    /// Client configured from `GENERATION_*` environment variables.
    pub fn from_env() -> Result<Self> {
        super::builder::GatewayClientBuilder::new().build()
    }

    pub fn builder() -> super::builder::GatewayClientBuilder {
        super::builder::GatewayClientBuilder::new()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Open a progress channel for a generation id returned earlier.
    pub async fn open_progress(&self, generation_id: &str) -> Result<ProgressHandle> {
        validate_generation_id(generation_id)?;
        self.progress.open(generation_id).await
    }

    /// Submit, then open a progress channel when the request's mode asks for one.
    pub async fn submit_tracked(&self, request: &GenerationRequest) -> Result<Submission> {
        let result = self.submit(request).await?;
        if !request.mode.wants_progress() {
            return Ok(Submission {
                result,
                progress: None,
                channel_error: None,
            });
        }

        match self.open_progress(&result.generation_id).await {
            Ok(handle) => Ok(Submission {
                result,
                progress: Some(handle),
                channel_error: None,
            }),
            Err(e) => {
                warn!(
                    generation_id = %result.generation_id,
                    error = %e,
                    "progress channel unavailable; generation was submitted"
                );
                Ok(Submission {
                    result,
                    progress: None,
                    channel_error: Some(e),
                })
            }
        }
    }

    /// Submit every request concurrently and wait for all of them.
    pub async fn submit_batch(&self, requests: Vec<GenerationRequest>) -> BatchStatus {
        BatchCoordinator::new(Arc::new(self.clone()))
            .with_max_concurrency(self.config.batch_concurrency)
            .submit_batch(requests)
            .await
    }
}
