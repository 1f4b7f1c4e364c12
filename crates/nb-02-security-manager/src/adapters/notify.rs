//! Notification sink adapters.

use crate::domain::Notification;
use crate::ports::NotificationSink;
use shared_types::Severity;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, n: Notification) {
        let recipients = n.recipients.join(",");
        match n.severity {
            Severity::Critical | Severity::High => {
                error!("[nb-02] NOTIFY [{}] {} - {} (to: {})", n.severity, n.title, n.body, recipients)
            }
            Severity::Medium => {
                warn!("[nb-02] NOTIFY [{}] {} - {} (to: {})", n.severity, n.title, n.body, recipients)
            }
            Severity::Low => {
                info!("[nb-02] NOTIFY [{}] {} - {} (to: {})", n.severity, n.title, n.body, recipients)
            }
        }
    }
}

/// Forwards notifications into a bounded channel. Drops when full.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotificationSink {
    /// Sink and its receiving end.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            warn!("[nb-02] Notification dropped: {}", e);
        }
    }
}
