//! # Algorithms Module
//!
//! Connection quality, partition detection and the health score.

pub mod health;
pub mod quality;

pub use health::{health_components, health_score, HealthInputs};
pub use quality::{connection_quality, error_score, latency_score, partition_detected};
