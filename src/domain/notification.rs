//! Notifications fanned out to event subscribers.
//!
//! One [`Notification`] is produced per subscriber: when an event changes,
//! when it is canceled, and when it is about to start. Delivery is
//! best-effort through the [`super::NotificationBus`]; nothing is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EventId, UserId};

/// Notification addressed to a single subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A subscribed event was modified.
    EventUpdated {
        /// Modified event.
        event_id: EventId,
        /// Recipient.
        user_id: UserId,
        /// Start time after the update.
        scheduled_time: DateTime<Utc>,
        /// When the notification was produced.
        timestamp: DateTime<Utc>,
    },

    /// A subscribed event was deleted.
    EventCanceled {
        /// Deleted event.
        event_id: EventId,
        /// Recipient.
        user_id: UserId,
        /// When the notification was produced.
        timestamp: DateTime<Utc>,
    },

    /// A subscribed event starts within the look-ahead window.
    Reminder {
        /// Upcoming event.
        event_id: EventId,
        /// Recipient.
        user_id: UserId,
        /// When the event starts.
        scheduled_time: DateTime<Utc>,
        /// When the notification was produced.
        timestamp: DateTime<Utc>,
    },
}

impl Notification {
    /// Returns the event this notification is about.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::EventUpdated { event_id, .. }
            | Self::EventCanceled { event_id, .. }
            | Self::Reminder { event_id, .. } => *event_id,
        }
    }

    /// Returns the recipient.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::EventUpdated { user_id, .. }
            | Self::EventCanceled { user_id, .. }
            | Self::Reminder { user_id, .. } => *user_id,
        }
    }

    /// Returns the notification kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::EventUpdated { .. } => "event_updated",
            Self::EventCanceled { .. } => "event_canceled",
            Self::Reminder { .. } => "reminder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let n = Notification::EventCanceled {
            event_id: EventId::new(3),
            user_id: UserId::new(8),
            timestamp: Utc::now(),
        };
        assert_eq!(n.event_id(), EventId::new(3));
        assert_eq!(n.user_id(), UserId::new(8));
        assert_eq!(n.kind_str(), "event_canceled");
    }

    #[test]
    fn reminder_serializes_with_kind_tag() {
        let n = Notification::Reminder {
            event_id: EventId::new(1),
            user_id: UserId::new(2),
            scheduled_time: Utc::now(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&n).unwrap_or_default();
        assert!(json.contains("\"kind\":\"reminder\""));
        assert!(json.contains("\"user_id\":2"));
    }
}
