//! Event subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, SubscriptionId, UserId};

/// A user's subscription to an event.
///
/// At most one subscription exists per `(event_id, user_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    /// Store-assigned identifier.
    pub id: SubscriptionId,
    /// Subscribed event.
    pub event_id: EventId,
    /// Subscribing user.
    pub user_id: UserId,
    /// Scheduled time the last reminder was sent for. Internal bookkeeping.
    #[serde(skip)]
    pub reminded_for: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Returns `true` if no reminder has gone out yet for an event starting
    /// at `scheduled_time`.
    ///
    /// A rescheduled event re-arms the reminder.
    #[must_use]
    pub fn reminder_due(&self, scheduled_time: DateTime<Utc>) -> bool {
        self.reminded_for != Some(scheduled_time)
    }
}
