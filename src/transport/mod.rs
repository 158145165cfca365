//! Duplex byte transports carrying framed delivery units.

pub mod memory;
pub mod websocket;

pub use memory::{memory_pair, MemoryConnector, MemoryPeer, MemoryTransport};
pub use websocket::{WebSocketConnector, WebSocketTransport};

use anyhow::Result;
use async_trait::async_trait;

/// An open connection. Each received item is one delivery unit holding one
/// or more frames.
#[async_trait]
pub trait Transport: Send {
    /// Next delivery unit; `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the session polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<Vec<u8>>>;

    /// Sends one delivery unit.
    async fn send(&mut self, unit: Vec<u8>) -> Result<()>;

    /// Closes our side of the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Opens connections. Resolving `connect` is the transport-level "open".
#[async_trait]
pub trait Connector: Send + Sync {
    fn url(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn Transport>>;
}
