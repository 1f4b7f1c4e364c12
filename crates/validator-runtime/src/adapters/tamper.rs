//! Store tamper reports routed to the security manager.

use nb_02_security_manager::{SecurityManagerApi, ThreatType};
use nb_04_state_store::TamperObserver;
use serde_json::json;
use shared_types::Severity;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::error;

/// Source recorded on `data_corruption` threats raised for the store.
pub const STORE_SOURCE: &str = "state-store";

/// `TamperObserver` raising a `data_corruption` threat per failed read.
///
/// The store calls observers inline, so the threat is recorded on a spawned
/// task. Outside a tokio runtime the failure is only logged.
pub struct SecurityTamperObserver {
    security: Arc<dyn SecurityManagerApi>,
}

impl SecurityTamperObserver {
    /// Observer reporting to `security`.
    pub fn new(security: Arc<dyn SecurityManagerApi>) -> Self {
        Self { security }
    }
}

impl TamperObserver for SecurityTamperObserver {
    fn on_integrity_violation(&self, key: &str) {
        let Ok(handle) = Handle::try_current() else {
            error!("[runtime] Tampered key {} reported outside a runtime", key);
            return;
        };
        let security = self.security.clone();
        let details = json!({ "key": key });
        handle.spawn(async move {
            security
                .detect_threat(ThreatType::DataCorruption, Severity::High, STORE_SOURCE, details)
                .await;
        });
    }
}
