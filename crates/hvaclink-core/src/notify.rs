// ── User notifications ──
//
// Every outcome a user should hear about (command success or failure,
// validation rejections, channel connect/disconnect) is published here as
// a `Notification`. Consumers render them however they like.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

const NOTIFICATION_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Broadcast hub for notifications. Cloning shares the channel.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Arc<Notification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Success, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Info, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, message.into());
    }

    fn publish(&self, level: NotificationLevel, message: String) {
        match level {
            NotificationLevel::Error => tracing::warn!(%message, "notification"),
            _ => tracing::debug!(%level, %message, "notification"),
        }
        // No subscribers is fine
        let _ = self.tx.send(Arc::new(Notification {
            level,
            message,
            at: Utc::now(),
        }));
    }
}
