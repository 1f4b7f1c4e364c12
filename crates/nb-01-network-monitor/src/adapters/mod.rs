//! # Adapters
//!
//! - `tcp`: tokio TCP transport and listener
//! - `memory`: in-memory transport
//! - `metrics`: peer-table metric source

pub mod memory;
pub mod metrics;
pub mod tcp;

pub use memory::{MemoryLink, MemoryTransport};
pub use metrics::PeerTableMetrics;
pub use tcp::{TcpLink, TcpPeerListener, TcpTransport};
