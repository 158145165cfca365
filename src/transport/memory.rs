use super::{Connector, Transport};
use crate::codec::{encode, Decoded, FrameCodec};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// In-process transport: delivery units travel over unbounded channels.
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn recv(&mut self) -> Option<Result<Vec<u8>>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn send(&mut self, unit: Vec<u8>) -> Result<()> {
        self.outbound
            .send(unit)
            .map_err(|_| anyhow!("memory peer is gone"))
    }

    async fn close(&mut self) -> Result<()> {
        self.inbound.close();
        Ok(())
    }
}

/// Server side of a memory connection
pub struct MemoryPeer {
    to_client: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
    codec: FrameCodec,
}

impl MemoryPeer {
    /// Sends raw bytes as one delivery unit.
    pub fn send_unit(&self, unit: Vec<u8>) -> Result<()> {
        self.to_client
            .as_ref()
            .ok_or_else(|| anyhow!("memory peer already closed"))?
            .send(unit)
            .map_err(|_| anyhow!("memory client is gone"))
    }

    /// Sends one message as a single-frame delivery unit.
    pub fn send_json(&self, message: &Value) -> Result<()> {
        self.send_unit(encode(message)?)
    }

    /// Next delivery unit from the client.
    pub async fn recv_unit(&mut self) -> Option<Vec<u8>> {
        self.from_client.recv().await
    }

    /// Next delivery unit from the client, decoded into messages.
    pub async fn recv_messages(&mut self) -> Option<Result<Vec<Map<String, Value>>>> {
        let unit = self.from_client.recv().await?;
        let decoded = match self.codec.decode(&unit) {
            Ok(decoded) => decoded,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            decoded
                .into_iter()
                .map(|frame| match frame {
                    Decoded::Message(message) => Ok(message),
                    Decoded::Malformed(e) => Err(e.into()),
                })
                .collect(),
        )
    }

    /// Ends the stream; the client sees the connection close.
    pub fn close(&mut self) {
        self.to_client = None;
    }
}

/// Hands out its transport once. A refusing connector fails every attempt.
pub struct MemoryConnector {
    url: String,
    transport: Mutex<Option<MemoryTransport>>,
}

impl MemoryConnector {
    pub fn refusing(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match transport {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(anyhow!("connection to {} refused", self.url)),
        }
    }
}

/// A connected connector/peer pair.
pub fn memory_pair(url: impl Into<String>) -> (MemoryConnector, MemoryPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();

    let connector = MemoryConnector {
        url: url.into(),
        transport: Mutex::new(Some(MemoryTransport { inbound, outbound })),
    };
    let peer = MemoryPeer {
        to_client: Some(to_client),
        from_client,
        codec: FrameCodec::strict(),
    };
    (connector, peer)
}
