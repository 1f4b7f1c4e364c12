//! # Exploit Simulations
//!
//! Attacks on the threshold-signing path. Each test states the attack and
//! asserts that the bridge state is unchanged by it.

pub mod replay;
