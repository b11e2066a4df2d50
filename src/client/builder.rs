use crate::client::core::GatewayClient;
use crate::client::policy::{RetryPolicy, Sleeper};
use crate::config::GatewayConfig;
use crate::progress::{ChannelConnector, ProgressChannel};
use crate::transport::{HttpTransport, WebSocketConnector};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
///
/// Anything not set explicitly comes from `GENERATION_*` environment variables.
#[derive(Default)]
pub struct GatewayClientBuilder {
    config: Option<GatewayConfig>,
    base_url: Option<String>,
    ws_url: Option<String>,
    api_key: Option<String>,
    max_attempts: Option<u32>,
    backoff_base: Option<Duration>,
    ping_interval: Option<Duration>,
    sleeper: Option<Arc<dyn Sleeper>>,
    connector: Option<Arc<dyn ChannelConnector>>,
}

impl GatewayClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration instead of the environment.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the backend base URL (mock servers in tests, staging, ...).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n.max(1));
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = Some(base);
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = Some(interval);
        self
    }

    /// Replace the backoff sleeper. Tests inject an instant one.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Replace the WebSocket connector used for progress channels.
    pub fn channel_connector(mut self, connector: Arc<dyn ChannelConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> Result<GatewayClient> {
        let mut config = self.config.unwrap_or_else(GatewayConfig::from_env);
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(ws) = self.ws_url {
            config.ws_url = Some(ws);
        }
        if let Some(key) = self.api_key {
            config.api_key = Some(key);
        }
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(base) = self.backoff_base {
            config.backoff_base_ms = base.as_millis() as u64;
        }
        config.validate()?;

        let transport = Arc::new(HttpTransport::new(&config)?);

        let mut policy = RetryPolicy::new(config.max_attempts, config.backoff_base());
        if let Some(sleeper) = self.sleeper {
            policy = policy.with_sleeper(sleeper);
        }

        let connector: Arc<dyn ChannelConnector> = match self.connector {
            Some(c) => c,
            None => Arc::new(WebSocketConnector::new(
                config.websocket_base()?,
                config.api_key.clone(),
                config.connect_timeout(),
            )),
        };
        let ping_interval = self.ping_interval.unwrap_or_else(|| config.ping_interval());
        let progress = ProgressChannel::new(connector, ping_interval);

        Ok(GatewayClient {
            config: Arc::new(config),
            transport,
            policy,
            progress,
        })
    }
}
