//! Domain layer for the security manager.

pub mod config;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod threats;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use keys::*;
pub use threats::*;
