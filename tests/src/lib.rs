//! # NockBridge Test Suite
//!
//! Unified test crate for behavior that spans subsystems.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Validator clusters on shared in-memory infrastructure
//! │
//! ├── exploits/         # Attack simulations against the signing path
//! │   └── replay.rs     # Replayed, reused and duplicated signatures
//! │
//! └── integration/      # Cross-subsystem flows
//!     ├── bridge_flows.rs
//!     └── security_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p nb-tests
//!
//! # By category
//! cargo test -p nb-tests integration::
//! cargo test -p nb-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p nb-tests
//! ```

pub mod exploits;
pub mod fixtures;
pub mod integration;
