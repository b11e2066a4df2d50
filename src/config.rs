//! Gateway configuration.
//!
//! Loaded from `GENERATION_*` environment variables or a YAML file. Every field
//! has a production-friendly default except `base_url`.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP base URL of the generation backend, e.g. `https://gen.internal:8000`.
    pub base_url: String,
    /// WebSocket base URL; derived from `base_url` when unset.
    pub ws_url: Option<String>,
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub ping_interval_secs: u64,
    pub connect_timeout_secs: u64,
    /// Deadline for status and cancel calls; submissions use the request's own timeout.
    pub default_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub proxy_url: Option<String>,
    pub batch_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            ws_url: None,
            api_key: None,
            max_attempts: 3,
            backoff_base_ms: 1000,
            ping_interval_secs: 30,
            connect_timeout_secs: 10,
            default_timeout_secs: 120,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
            proxy_url: None,
            batch_concurrency: 5,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `GENERATION_*` environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_string("GENERATION_API_URL").unwrap_or(d.base_url),
            ws_url: env_string("GENERATION_WS_URL"),
            api_key: env_string("GENERATION_API_KEY"),
            max_attempts: env_parse("GENERATION_MAX_ATTEMPTS").unwrap_or(d.max_attempts),
            backoff_base_ms: env_parse("GENERATION_BACKOFF_BASE_MS").unwrap_or(d.backoff_base_ms),
            ping_interval_secs: env_parse("GENERATION_PING_INTERVAL_SECS")
                .unwrap_or(d.ping_interval_secs),
            connect_timeout_secs: env_parse("GENERATION_CONNECT_TIMEOUT_SECS")
                .unwrap_or(d.connect_timeout_secs),
            default_timeout_secs: env_parse("GENERATION_TIMEOUT_SECS")
                .unwrap_or(d.default_timeout_secs),
            pool_max_idle_per_host: env_parse("GENERATION_HTTP_POOL_MAX_IDLE_PER_HOST")
                .unwrap_or(d.pool_max_idle_per_host),
            pool_idle_timeout_secs: env_parse("GENERATION_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .unwrap_or(d.pool_idle_timeout_secs),
            proxy_url: env_string("GENERATION_PROXY_URL"),
            batch_concurrency: env_parse("GENERATION_BATCH_CONCURRENCY")
                .unwrap_or(d.batch_concurrency),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid gateway config: {}", e),
                ErrorContext::new().with_source("config_loader"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_field_path(path.display().to_string()),
            },
            other => other,
        })
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs.max(1))
    }

    /// Reject configurations that cannot produce a working client.
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base_url: {}", e),
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_source("config_validator"),
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "base_url must use http or https",
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_source("config_validator"),
            ));
        }
        self.websocket_base()?;
        Ok(())
    }

    /// WebSocket base: `ws_url` if set, else `base_url` with the scheme swapped.
    pub fn websocket_base(&self) -> Result<Url> {
        let ctx = || {
            ErrorContext::new()
                .with_field_path("config.ws_url")
                .with_source("config_validator")
        };
        if let Some(ws) = &self.ws_url {
            let url = Url::parse(ws).map_err(|e| {
                Error::configuration_with_context(format!("invalid ws_url: {}", e), ctx())
            })?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(Error::configuration_with_context(
                    "ws_url must use ws or wss",
                    ctx(),
                ));
            }
            return Ok(url);
        }
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(format!("invalid base_url: {}", e), ctx())
        })?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            Error::configuration_with_context("cannot derive websocket url from base_url", ctx())
        })?;
        Ok(url)
    }
}
