//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use generation_gateway::client::Sleeper;
use generation_gateway::{GatewayClient, GatewayConfig};
use mockito::{Server, ServerGuard};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested backoff delays and returns immediately.
#[derive(Default)]
pub struct InstantSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

/// Test fixture that manages a mock backend.
pub struct MockBackend {
    pub server: ServerGuard,
    pub sleeper: Arc<InstantSleeper>,
}

impl MockBackend {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            sleeper: Arc::new(InstantSleeper::default()),
        }
    }

    pub fn base_url(&self) -> String {
        self.server.url()
    }

    /// Client pointed at the mock server with instant backoff.
    pub fn client(&self) -> GatewayClient {
        client_for(&self.base_url(), self.sleeper.clone())
    }

    pub fn recorded_delays(&self) -> Vec<Duration> {
        self.sleeper.delays.lock().unwrap().clone()
    }
}

pub fn client_for(base_url: &str, sleeper: Arc<InstantSleeper>) -> GatewayClient {
    let mut config = GatewayConfig::new(base_url);
    config.connect_timeout_secs = 2;
    GatewayClient::builder()
        .config(config)
        .sleeper(sleeper)
        .build()
        .expect("client builds")
}
