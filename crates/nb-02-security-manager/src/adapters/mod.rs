//! # Adapters
//!
//! - `estimators`: reputation book, z-score anomaly detector, subnet Sybil
//!   estimator, payload pattern inspector
//! - `notify`: log and channel notification sinks

pub mod estimators;
pub mod notify;

pub use estimators::{PatternInspector, ReputationBook, SubnetSybilEstimator, ZScoreAnomalyDetector};
pub use notify::{ChannelNotificationSink, LogNotificationSink};
