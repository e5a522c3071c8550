//! Live notification delivery.
//!
//! Persisted notifications are fanned out over a broadcast channel; each SSE
//! connection subscribes and keeps only the envelopes addressed to its user.
//! Delivery is best-effort: with nobody listening the envelope is dropped.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::Notification;

/// A notification addressed to one user.
#[derive(Debug, Clone)]
pub struct PushEnvelope {
    pub user_id: i64,
    pub notification: Notification,
}

/// Sink for live notification delivery.
pub trait PushChannel: Send + Sync {
    /// Hand a notification to the live channel. Never fails.
    fn deliver(&self, user_id: i64, notification: &Notification);
}

#[derive(Clone)]
pub struct PushHub {
    sender: broadcast::Sender<PushEnvelope>,
}

impl PushHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEnvelope> {
        self.sender.subscribe()
    }
}

impl PushChannel for PushHub {
    fn deliver(&self, user_id: i64, notification: &Notification) {
        let envelope = PushEnvelope {
            user_id,
            notification: notification.clone(),
        };
        if self.sender.send(envelope).is_err() {
            debug!(
                "No live listeners for notification {} (user {user_id})",
                notification.notification_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(id: i64, user_id: i64) -> Notification {
        Notification {
            notification_id: id,
            user_id,
            title: "Hello".into(),
            message: "World".into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn delivery_without_listeners_is_silent() {
        let hub = PushHub::new(4);
        hub.deliver(1, &notification(1, 1));
    }

    #[tokio::test]
    async fn subscribers_receive_envelopes() {
        let hub = PushHub::new(4);
        let mut rx = hub.subscribe();
        hub.deliver(5, &notification(10, 5));

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.user_id, 5);
        assert_eq!(envelope.notification.notification_id, 10);
    }
}
