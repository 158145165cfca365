use super::{Connector, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::debug;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Connects to a telemetry server over WebSocket.
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("WebSocket handshake with {} failed", self.url))?;
        debug!("WebSocket {} upgraded ({})", self.url, response.status());
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// One WebSocket message is one delivery unit. Binary and text messages both
/// carry framed bytes; control messages are handled by tungstenite.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<Vec<u8>>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };
            match message {
                Message::Binary(bytes) => return Some(Ok(bytes)),
                Message::Text(text) => return Some(Ok(text.into_bytes())),
                Message::Close(frame) => {
                    debug!("WebSocket close frame: {:?}", frame);
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send(&mut self, unit: Vec<u8>) -> Result<()> {
        self.stream
            .send(Message::Binary(unit))
            .await
            .context("WebSocket send failed")
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .context("WebSocket close failed")
    }
}
