//! Prometheus metrics for NockBridge validators.
//!
//! All metrics follow the naming convention: `nb_<area>_<metric>_<unit>`
//!
//! The collectors are process-global. The runtime writes them from its
//! scheduled tasks; subsystem crates stay metric-free.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PEER NETWORK (NB-01)
    // =========================================================================

    /// Connected validator peers
    pub static ref PEERS_CONNECTED: Gauge = Gauge::new(
        "nb_network_peers_connected",
        "Number of currently connected validator peers"
    ).expect("metric creation failed");

    /// Composite network health score
    pub static ref HEALTH_SCORE: Gauge = Gauge::new(
        "nb_network_health_score",
        "Weighted network health score (0-100)"
    ).expect("metric creation failed");

    /// Network alerts raised
    pub static ref ALERTS_RAISED: CounterVec = CounterVec::new(
        Opts::new("nb_network_alerts_raised_total", "Network alerts raised"),
        &["alert_type", "severity"]
    ).expect("metric creation failed");

    // =========================================================================
    // SECURITY (NB-02)
    // =========================================================================

    /// Threats detected by type
    pub static ref THREATS_DETECTED: CounterVec = CounterVec::new(
        Opts::new("nb_security_threats_detected_total", "Threats detected"),
        &["threat_type", "severity"]
    ).expect("metric creation failed");

    /// Validator signature failures (for alerting)
    pub static ref SIGNATURE_FAILURES: Counter = Counter::new(
        "nb_security_signature_failures_total",
        "Validator attestations whose signature did not verify"
    ).expect("metric creation failed");

    // =========================================================================
    // BRIDGE (NB-03 and coordinator)
    // =========================================================================

    /// Instructions finalized on the settlement program
    pub static ref INSTRUCTIONS_FINALIZED: CounterVec = CounterVec::new(
        Opts::new("nb_bridge_instructions_finalized_total", "Instructions finalized"),
        &["kind"]  // kind: deposit/withdrawal/pause
    ).expect("metric creation failed");

    /// Signing rounds still below threshold
    pub static ref ROUNDS_OPEN: Gauge = Gauge::new(
        "nb_bridge_rounds_open",
        "Signing rounds published by this validator and not yet finalized"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Errors by component and type
    pub static ref SUBSYSTEM_ERRORS: CounterVec = CounterVec::new(
        Opts::new("nb_subsystem_errors_total", "Errors by component and type"),
        &["component", "error_type"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; collectors already present are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Network
        Box::new(PEERS_CONNECTED.clone()),
        Box::new(HEALTH_SCORE.clone()),
        Box::new(ALERTS_RAISED.clone()),
        // Security
        Box::new(THREATS_DETECTED.clone()),
        Box::new(SIGNATURE_FAILURES.clone()),
        // Bridge
        Box::new(INSTRUCTIONS_FINALIZED.clone()),
        Box::new(ROUNDS_OPEN.clone()),
        // Errors
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all registered metrics as Prometheus text exposition.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
