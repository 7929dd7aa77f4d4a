//! User-facing notices emitted by controllers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            ttl,
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>, ttl: Duration) -> Self {
        Self::new(NotificationLevel::Success, message, ttl)
    }

    pub fn error(message: impl Into<String>, ttl: Duration) -> Self {
        Self::new(NotificationLevel::Error, message, ttl)
    }

    pub fn info(message: impl Into<String>, ttl: Duration) -> Self {
        Self::new(NotificationLevel::Info, message, ttl)
    }
}

pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: Notification);
}

pub struct BroadcastNotifier {
    events: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn enqueue(&self, notification: Notification) {
        tracing::debug!(level = ?notification.level, message = %notification.message, "notification");
        // No subscribers is fine; nobody is looking at the screen.
        let _ = self.events.send(notification);
    }
}

/// Non-blocking.
pub fn drain_pending(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut pending = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(notification) => pending.push(notification),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notification receiver lagged");
            }
            Err(_) => break,
        }
    }
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_enqueued_notices_in_order() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        notifier.enqueue(Notification::success("first", Duration::from_secs(5)));
        notifier.enqueue(Notification::error("second", Duration::from_secs(5)));

        let pending = drain_pending(&mut rx);
        let messages: Vec<_> = pending.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
        assert_eq!(pending[1].level, NotificationLevel::Error);
        assert!(drain_pending(&mut rx).is_empty());
    }

    #[test]
    fn enqueue_without_subscribers_does_not_panic() {
        let notifier = BroadcastNotifier::default();
        notifier.enqueue(Notification::info("nobody listening", Duration::from_secs(1)));
    }
}
