//! Domain layer for the network monitor.

pub mod alerts;
pub mod config;
pub mod entities;
pub mod errors;
pub mod wire;

pub use alerts::*;
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use wire::*;
