//! TCP peer transport (tokio).
//!
//! One JSON message per line. Reads go through `Lines::next_line`, which is
//! cancel-safe, so a link can be raced against heartbeat timers without
//! losing partial lines.

use crate::domain::{decode_line, encode_line, TransportError, WireMessage};
use crate::ports::{PeerLink, PeerTransport};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

/// Dials peers over TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Transport giving up on a dial after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl PeerTransport for TcpTransport {
    async fn connect(&self, address: &str) -> Result<Box<dyn PeerLink>, TransportError> {
        let connect_err = |reason: String| TransportError::Connect {
            address: address.to_string(),
            reason,
        };
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| connect_err("timed out".into()))?
            .map_err(|e| connect_err(e.to_string()))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpLink::new(stream)))
    }
}

/// A line-framed TCP link.
#[derive(Debug)]
pub struct TcpLink {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TcpLink {
    /// Wrap a connected stream.
    pub fn new(stream: TcpStream) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }
}

#[async_trait]
impl PeerLink for TcpLink {
    async fn send(&mut self, message: &WireMessage) -> Result<(), TransportError> {
        let line = encode_line(message)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<WireMessage>, TransportError> {
        match self.lines.next_line().await? {
            Some(line) => decode_line(&line).map(Some),
            None => Ok(None),
        }
    }
}

/// Accepts inbound peer links.
#[derive(Debug)]
pub struct TcpPeerListener {
    listener: TcpListener,
}

impl TcpPeerListener {
    /// Bind to `address`.
    pub async fn bind(address: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self { listener })
    }

    /// Bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next inbound link.
    pub async fn accept(&self) -> Result<(TcpLink, SocketAddr), TransportError> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((TcpLink::new(stream), addr))
    }
}
