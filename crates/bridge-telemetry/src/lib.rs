//! # Bridge Telemetry
//!
//! Structured logging and Prometheus metrics for NockBridge validators.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // tracing macros and the metric statics are live from here on
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NB_SERVICE_NAME` | `nockbridge-validator` | Service name in the startup line |
//! | `NB_LOG_LEVEL` | `info` | Log filter (`RUST_LOG` overrides) |
//! | `NB_LOG_FORMAT` | `pretty` | `pretty` or `json` |
//! | `NB_METRICS_ENABLED` | `true` | Register Prometheus collectors |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::build_filter;
pub use metrics::{
    gather_metrics, register_metrics, ALERTS_RAISED, HEALTH_SCORE, INSTRUCTIONS_FINALIZED,
    PEERS_CONNECTED, ROUNDS_OPEN, SIGNATURE_FAILURES, SUBSYSTEM_ERRORS, THREATS_DETECTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The global subscriber could not be installed
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    /// A collector could not be registered or encoded
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and, when enabled, register the metric collectors.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }
    logging::init_logging(config)?;

    tracing::info!(
        service = %config.service_name,
        format = ?config.log_format,
        metrics = config.metrics_enabled,
        "Telemetry initialized"
    );
    Ok(())
}

/// Increment a metric, optionally with label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
