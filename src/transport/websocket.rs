//! WebSocket connector for progress channels.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::TransportError;
use crate::progress::{ChannelConnector, ChannelLink, InboundFrame};
use crate::{Error, ErrorContext, Result};

const CHANNEL_BUFFER: usize = 64;

/// Connects to `<ws_base>/ws/generation/{id}` and pumps frames through tasks.
pub struct WebSocketConnector {
    base: Url,
    api_key: Option<String>,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(base: Url, api_key: Option<String>, connect_timeout: Duration) -> Self {
        Self {
            base,
            api_key,
            connect_timeout,
        }
    }

    pub fn url_for(&self, generation_id: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::configuration_with_context(
                    "websocket base url cannot carry a path",
                    ErrorContext::new()
                        .with_field_path("config.ws_url")
                        .with_source("websocket_connector"),
                )
            })?
            .pop_if_empty()
            .extend(&["ws", "generation", generation_id]);
        Ok(url)
    }
}

fn transport_failure(err: TransportError, generation_id: &str) -> Error {
    Error::Transport {
        category: err.category(),
        message: err.to_string(),
        context: ErrorContext::new()
            .with_source("websocket_connector")
            .with_details(format!("generation_id: {}", generation_id)),
    }
}

#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn connect(&self, generation_id: &str) -> Result<ChannelLink> {
        let url = self.url_for(generation_id)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| transport_failure(TransportError::WebSocket(e), generation_id))?;
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e| {
                Error::configuration_with_context(
                    format!("api key is not a valid header value: {}", e),
                    ErrorContext::new().with_source("websocket_connector"),
                )
            })?;
            request.headers_mut().insert("authorization", value);
        }

        let (stream, _response) = timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                transport_failure(TransportError::ConnectTimeout(self.connect_timeout), generation_id)
            })?
            .map_err(|e| transport_failure(TransportError::WebSocket(e), generation_id))?;

        let (mut write, mut read) = stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(CHANNEL_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<InboundFrame>(CHANNEL_BUFFER);

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if write.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        let id = generation_id.to_string();
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let frame = match msg {
                    Ok(Message::Text(text)) => InboundFrame::Text(text),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => InboundFrame::Text(text),
                        Err(_) => continue,
                    },
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        let _ = in_tx.send(InboundFrame::Closed(reason)).await;
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(generation_id = %id, error = %e, "websocket read failed");
                        let _ = in_tx.send(InboundFrame::Closed(Some(e.to_string()))).await;
                        return;
                    }
                };
                if in_tx.send(frame).await.is_err() {
                    return;
                }
            }
            let _ = in_tx.send(InboundFrame::Closed(None)).await;
        });

        tracing::debug!(generation_id, url = %url, "websocket connected");
        Ok(ChannelLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
