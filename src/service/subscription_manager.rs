//! Subscription manager: who follows which event, and fan-out of
//! notifications to them.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{Event, EventId, Notification, NotificationBus, Subscription, UserId};
use crate::error::ApiError;
use crate::persistence::{Session, Store, StoreError};

/// Owns the subscription lifecycle and the per-subscriber notifications.
///
/// Operations that stand alone open their own session. The cascade and the
/// reminder claim run inside a session supplied by the caller so they commit
/// or roll back together with the surrounding operation. Notifications are
/// only published after that session has committed.
#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    store: Arc<dyn Store>,
    bus: NotificationBus,
}

impl SubscriptionManager {
    /// Creates a new `SubscriptionManager`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, bus: NotificationBus) -> Self {
        Self { store, bus }
    }

    /// Returns the bus notifications are published on.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Subscribes `user_id` to `event_id`.
    ///
    /// Returns the subscription and whether it was created by this call.
    /// Subscribing twice returns the existing subscription unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] or [`ApiError::UserNotFound`] if
    /// either side is absent, including an event deleted while subscribing.
    pub async fn subscribe(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(Subscription, bool), ApiError> {
        let mut session = self.store.begin().await?;

        if session.event_by_id(event_id).await?.is_none() {
            return Err(ApiError::EventNotFound(event_id));
        }
        if session.user_by_id(user_id).await?.is_none() {
            return Err(ApiError::UserNotFound(user_id));
        }
        if let Some(existing) = session.subscription(event_id, user_id).await? {
            return Ok((existing, false));
        }

        let subscription = session
            .insert_subscription(event_id, user_id)
            .await
            .map_err(|e| vanished_event(event_id, e))?;
        session.commit().await.map_err(|e| vanished_event(event_id, e))?;

        tracing::info!(%event_id, %user_id, "subscribed");
        Ok((subscription, true))
    }

    /// Removes the subscription of `user_id` to `event_id` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SubscriptionNotFound`] if the pair does not exist;
    /// nothing changes in that case.
    pub async fn unsubscribe(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Subscription, ApiError> {
        let mut session = self.store.begin().await?;

        let subscription = session
            .subscription(event_id, user_id)
            .await?
            .ok_or(ApiError::SubscriptionNotFound { event_id, user_id })?;
        session.delete_subscription(subscription.id).await?;
        session.commit().await?;

        tracing::info!(%event_id, %user_id, "unsubscribed");
        Ok(subscription)
    }

    /// Lists the subscriptions of an event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event is absent.
    pub async fn list_subscribers(&self, event_id: EventId) -> Result<Vec<Subscription>, ApiError> {
        let mut session = self.store.begin().await?;

        if session.event_by_id(event_id).await?.is_none() {
            return Err(ApiError::EventNotFound(event_id));
        }
        Ok(session.subscriptions_for_event(event_id).await?)
    }

    /// Removes every subscription of `event_id` inside `session` and returns
    /// them. Must run before the event row itself is removed.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn cascade_on_delete(
        &self,
        session: &mut dyn Session,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, ApiError> {
        let removed = session.delete_subscriptions_for_event(event_id).await?;
        tracing::debug!(%event_id, subscribers = removed.len(), "subscriptions cascaded");
        Ok(removed)
    }

    /// Marks every subscriber of `event` that has not yet been reminded for
    /// its current start time, inside `session`, and returns them.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn claim_reminders(
        &self,
        session: &mut dyn Session,
        event: &Event,
    ) -> Result<Vec<Subscription>, ApiError> {
        let mut due = Vec::new();
        for subscription in session.subscriptions_for_event(event.id).await? {
            if subscription.reminder_due(event.scheduled_time) {
                session
                    .mark_reminded(subscription.id, event.scheduled_time)
                    .await?;
                due.push(subscription);
            }
        }
        Ok(due)
    }

    /// Claims the due reminders of every event in `events` in one session.
    ///
    /// The markers are committed before anything is published, so a reminder
    /// is sent at most once per start time.
    ///
    /// # Errors
    ///
    /// Propagates store failures; no marker is kept in that case.
    pub async fn claim_due(
        &self,
        events: &[Event],
    ) -> Result<Vec<(Event, Vec<Subscription>)>, ApiError> {
        let mut session = self.store.begin().await?;
        let mut claimed = Vec::new();
        for event in events {
            let due = self.claim_reminders(&mut *session, event).await?;
            if !due.is_empty() {
                claimed.push((event.clone(), due));
            }
        }
        session.commit().await?;
        Ok(claimed)
    }

    /// Tells every subscriber that `event` changed. Returns how many
    /// notifications were produced.
    pub fn notify_on_update(&self, event: &Event, subscribers: &[Subscription]) -> usize {
        let timestamp = Utc::now();
        for subscription in subscribers {
            self.bus.publish(Notification::EventUpdated {
                event_id: event.id,
                user_id: subscription.user_id,
                scheduled_time: event.scheduled_time,
                timestamp,
            });
        }
        subscribers.len()
    }

    /// Tells every former subscriber that `event_id` was canceled. Returns
    /// how many notifications were produced.
    pub fn notify_on_delete(&self, event_id: EventId, subscribers: &[Subscription]) -> usize {
        let timestamp = Utc::now();
        for subscription in subscribers {
            self.bus.publish(Notification::EventCanceled {
                event_id,
                user_id: subscription.user_id,
                timestamp,
            });
        }
        subscribers.len()
    }

    /// Reminds every listed subscriber that `event` is about to start.
    /// Returns how many notifications were produced.
    pub fn notify_reminder(&self, event: &Event, subscribers: &[Subscription]) -> usize {
        let timestamp = Utc::now();
        for subscription in subscribers {
            self.bus.publish(Notification::Reminder {
                event_id: event.id,
                user_id: subscription.user_id,
                scheduled_time: event.scheduled_time,
                timestamp,
            });
        }
        subscribers.len()
    }
}

/// A foreign-key failure while subscribing means the event went away.
fn vanished_event(event_id: EventId, err: StoreError) -> ApiError {
    match err {
        StoreError::ForeignKey(_) => ApiError::EventNotFound(event_id),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{NewEvent, User};
    use crate::persistence::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        store: Arc<dyn Store>,
        manager: SubscriptionManager,
        alice: User,
        bob: User,
        event: Event,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let Ok(mut session) = store.begin().await else {
            panic!("begin should succeed");
        };
        let now = Utc::now();
        let Ok(alice) = session.insert_user("alice", "hash", now).await else {
            panic!("insert alice");
        };
        let Ok(bob) = session.insert_user("bob", "hash", now).await else {
            panic!("insert bob");
        };
        let new_event = NewEvent {
            description: "Standup".to_string(),
            location: "Room 1".to_string(),
            scheduled_time: now + Duration::hours(1),
            popularity: 0,
        };
        let Ok(event) = session.insert_event(&new_event, "alice", now).await else {
            panic!("insert event");
        };
        let Ok(()) = session.commit().await else {
            panic!("commit");
        };

        let manager = SubscriptionManager::new(Arc::clone(&store), NotificationBus::new(16));
        Fixture {
            store,
            manager,
            alice,
            bob,
            event,
        }
    }

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let f = fixture().await;
        let Ok((first, true)) = f.manager.subscribe(f.event.id, f.alice.id).await else {
            panic!("first subscribe should create");
        };
        let Ok((second, false)) = f.manager.subscribe(f.event.id, f.alice.id).await else {
            panic!("resubscribe should return the existing row");
        };
        assert_eq!(first.id, second.id);

        let Ok(subscribers) = f.manager.list_subscribers(f.event.id).await else {
            panic!("list should succeed");
        };
        assert_eq!(subscribers.len(), 1);
    }

    #[tokio::test]
    async fn subscribe_to_missing_event_is_not_found() {
        let f = fixture().await;
        let missing = EventId::new(999);
        assert!(matches!(
            f.manager.subscribe(missing, f.alice.id).await,
            Err(ApiError::EventNotFound(id)) if id == missing
        ));
        assert!(matches!(
            f.manager.subscribe(f.event.id, UserId::new(999)).await,
            Err(ApiError::UserNotFound(_))
        ));
    }

    #[test]
    fn foreign_key_failure_reads_as_missing_event() {
        let id = EventId::new(5);
        assert!(matches!(
            vanished_event(id, StoreError::ForeignKey("event gone".to_string())),
            ApiError::EventNotFound(missing) if missing == id
        ));
        assert!(matches!(
            vanished_event(id, StoreError::Conflict("dup".to_string())),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn unsubscribe_non_subscriber_leaves_state_unchanged() {
        let f = fixture().await;
        let Ok(_) = f.manager.subscribe(f.event.id, f.alice.id).await else {
            panic!("subscribe should succeed");
        };

        assert!(matches!(
            f.manager.unsubscribe(f.event.id, f.bob.id).await,
            Err(ApiError::SubscriptionNotFound { .. })
        ));

        let Ok(subscribers) = f.manager.list_subscribers(f.event.id).await else {
            panic!("list should succeed");
        };
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers.first().map(|s| s.user_id), Some(f.alice.id));
    }

    #[tokio::test]
    async fn unsubscribe_returns_removed_pair() {
        let f = fixture().await;
        let Ok((created, _)) = f.manager.subscribe(f.event.id, f.bob.id).await else {
            panic!("subscribe should succeed");
        };
        let Ok(removed) = f.manager.unsubscribe(f.event.id, f.bob.id).await else {
            panic!("unsubscribe should succeed");
        };
        assert_eq!(created, removed);

        let Ok(subscribers) = f.manager.list_subscribers(f.event.id).await else {
            panic!("list should succeed");
        };
        assert!(subscribers.is_empty());
    }

    #[tokio::test]
    async fn list_subscribers_of_missing_event_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.manager.list_subscribers(EventId::new(42)).await,
            Err(ApiError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cascade_removes_every_subscription() {
        let f = fixture().await;
        for user in [f.alice.id, f.bob.id] {
            let Ok(_) = f.manager.subscribe(f.event.id, user).await else {
                panic!("subscribe should succeed");
            };
        }

        let Ok(mut session) = f.store.begin().await else {
            panic!("begin should succeed");
        };
        let Ok(removed) = f.manager.cascade_on_delete(&mut *session, f.event.id).await else {
            panic!("cascade should succeed");
        };
        assert_eq!(removed.len(), 2);
        let Ok(true) = session.delete_event(f.event.id).await else {
            panic!("event row should be deletable after cascade");
        };
        let Ok(()) = session.commit().await else {
            panic!("commit");
        };
    }

    #[tokio::test]
    async fn claim_reminders_marks_once_per_start_time() {
        let f = fixture().await;
        let Ok(_) = f.manager.subscribe(f.event.id, f.alice.id).await else {
            panic!("subscribe should succeed");
        };

        for expected in [1, 0] {
            let Ok(mut session) = f.store.begin().await else {
                panic!("begin should succeed");
            };
            let Ok(due) = f.manager.claim_reminders(&mut *session, &f.event).await else {
                panic!("claim should succeed");
            };
            assert_eq!(due.len(), expected);
            let Ok(()) = session.commit().await else {
                panic!("commit");
            };
        }

        let mut moved = f.event.clone();
        moved.scheduled_time += Duration::minutes(15);
        let Ok(mut session) = f.store.begin().await else {
            panic!("begin should succeed");
        };
        let Ok(due) = f.manager.claim_reminders(&mut *session, &moved).await else {
            panic!("claim should succeed");
        };
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn notifications_reach_the_bus() {
        let f = fixture().await;
        let mut rx = f.manager.bus().subscribe();
        let Ok((subscription, _)) = f.manager.subscribe(f.event.id, f.bob.id).await else {
            panic!("subscribe should succeed");
        };

        assert_eq!(f.manager.notify_on_update(&f.event, &[subscription.clone()]), 1);
        assert_eq!(f.manager.notify_on_delete(f.event.id, &[subscription]), 1);

        let Ok(Notification::EventUpdated { user_id, .. }) = rx.recv().await else {
            panic!("expected an update notification");
        };
        assert_eq!(user_id, f.bob.id);
        let Ok(Notification::EventCanceled { event_id, .. }) = rx.recv().await else {
            panic!("expected a cancel notification");
        };
        assert_eq!(event_id, f.event.id);
    }
}
