//! In-memory peer transport for tests and single-process clusters.
//!
//! Links carry encoded lines, so framing and malformed-input handling are
//! the same as over TCP.

use crate::domain::{decode_line, encode_line, TransportError, WireMessage};
use crate::ports::{PeerLink, PeerTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;

const LINK_CAPACITY: usize = 64;

/// Address registry of in-memory listeners.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    listeners: Mutex<HashMap<String, mpsc::UnboundedSender<MemoryLink>>>,
}

impl MemoryTransport {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept links dialed to `address`. Replaces any earlier listener.
    pub fn listen(&self, address: &str) -> mpsc::UnboundedReceiver<MemoryLink> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().insert(address.to_string(), tx);
        rx
    }

    /// Stop accepting on `address`.
    pub fn unlisten(&self, address: &str) {
        self.listeners.lock().remove(address);
    }
}

#[async_trait]
impl PeerTransport for MemoryTransport {
    async fn connect(&self, address: &str) -> Result<Box<dyn PeerLink>, TransportError> {
        let refused = || TransportError::Connect {
            address: address.to_string(),
            reason: "connection refused".into(),
        };
        let acceptor = self.listeners.lock().get(address).cloned().ok_or_else(refused)?;
        let (local, remote) = MemoryLink::pair();
        acceptor.send(remote).map_err(|_| refused())?;
        Ok(Box::new(local))
    }
}

/// One end of an in-memory link.
#[derive(Debug)]
pub struct MemoryLink {
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
}

impl MemoryLink {
    /// Two connected ends.
    pub fn pair() -> (MemoryLink, MemoryLink) {
        let (a_tx, a_rx) = mpsc::channel(LINK_CAPACITY);
        let (b_tx, b_rx) = mpsc::channel(LINK_CAPACITY);
        (
            MemoryLink { tx: a_tx, rx: b_rx },
            MemoryLink { tx: b_tx, rx: a_rx },
        )
    }

    /// Write a raw line, bypassing encoding.
    pub async fn send_raw(&self, line: &str) -> Result<(), TransportError> {
        self.tx
            .send(line.to_string())
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl PeerLink for MemoryLink {
    async fn send(&mut self, message: &WireMessage) -> Result<(), TransportError> {
        let line = encode_line(message)?;
        self.tx.send(line).await.map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<WireMessage>, TransportError> {
        match self.rx.recv().await {
            Some(line) => decode_line(&line).map(Some),
            None => Ok(None),
        }
    }
}
