//! # NockBridge Validator Runtime
//!
//! Library side of the `nockbridge-validator` binary: configuration, the
//! bridge coordinator, the task scheduler and the runtime that wires the
//! four subsystems together.
//!
//! ## Subsystems
//!
//! 1. Peer Network Monitor (nb-01) - liveness, partitions, alerts
//! 2. Security Manager (nb-02) - threats, mitigation, lockdown
//! 3. Bridge Protocol (nb-03) - M-of-N settlement program
//! 4. State Store (nb-04) - shared encrypted coordination state
//!
//! ## Module Structure
//!
//! ```text
//! validator-runtime/
//! ├── config       # TOML + NB_* overrides, production checks
//! ├── scheduler    # Named periodic jobs with one shutdown signal
//! ├── coordinator/ # Signing rounds: observe, sign, collect, finalize
//! ├── adapters/    # Store tamper observer, security counters
//! └── runtime      # ValidatorRuntime wiring and job bodies
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod coordinator;
pub mod runtime;
pub mod scheduler;

// Re-exports
pub use config::{ConfigError, ValidatorConfig};
pub use coordinator::{
    BridgeCoordinator, BridgeRequest, ConsensusMessage, CoordinatorDependencies,
    CoordinatorError, Finalization, Processed, RoundStatus, Vote,
};
pub use runtime::{RuntimeError, RuntimeParts, ValidatorRuntime, ValidatorServices};
pub use scheduler::TaskScheduler;
