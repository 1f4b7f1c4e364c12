//! # Algorithms Module
//!
//! Token encoding, scoring, rolling statistics and subnet grouping.

pub mod scoring;
pub mod stats;
pub mod subnet;
pub mod tokens;

pub use scoring::ScoreCard;
pub use stats::RollingStats;
pub use subnet::subnet_of;
pub use tokens::{decode_token, encode_token};
