//! # Shared Types Crate
//!
//! Identity, signature, time and rate-limiting primitives used by every
//! bridge subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types live here.
//! - **Key-as-Identity**: a validator is named by its Ed25519 public key, so
//!   no subsystem needs a separate id-to-key mapping.
//! - **Injected Time**: all time-dependent rules read a `TimeSource`.

pub mod entities;
pub mod errors;
pub mod rate_limiter;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use rate_limiter::RateLimiter;
pub use time::{ManualTimeSource, SharedTimeSource, SystemTimeSource, TimeSource};
