//! Broadcast channel for subscriber notifications.
//!
//! [`NotificationBus`] wraps a [`tokio::sync::broadcast`] channel. Every
//! notification is logged and then offered to whoever is listening; with no
//! listeners it is dropped. There is no retry and no history.

use tokio::sync::broadcast;

use super::Notification;

/// Broadcast bus for [`Notification`]s.
///
/// When the ring buffer is full, the oldest notifications are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Creates a new `NotificationBus` with the given channel capacity.
    ///
    /// A capacity of zero is bumped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a notification to all receivers.
    ///
    /// Returns the number of receivers that got it.
    pub fn publish(&self, notification: Notification) -> usize {
        tracing::info!(
            kind = notification.kind_str(),
            event_id = %notification.event_id(),
            user_id = %notification.user_id(),
            "notification"
        );
        self.sender.send(notification).unwrap_or(0)
    }

    /// Creates a receiver for all future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
