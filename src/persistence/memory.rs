//! In-process store.
//!
//! [`MemoryStore`] keeps all tables in one `MemoryState` behind a
//! [`tokio::sync::Mutex`]. A [`MemorySession`] holds the lock for its whole
//! lifetime and works on a private copy of the tables; `commit` swaps the copy
//! in, dropping the session throws it away. Sessions are therefore fully
//! serialized, which is plenty for tests and single-node development.
//!
//! A task must not open a second session while it still holds one.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Session, Store, StoreError};
use crate::domain::{
    Event, EventId, EventPatch, NewEvent, Page, SortField, Subscription, SubscriptionId, User,
    UserId,
};

/// Tables of the in-process store. Map order is insertion (id) order.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    events: BTreeMap<EventId, Event>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    last_user_id: i64,
    last_event_id: i64,
    last_subscription_id: i64,
}

impl MemoryState {
    fn slot_taken(&self, candidate: &Event) -> Option<&Event> {
        self.events
            .values()
            .find(|existing| existing.id != candidate.id && existing.same_slot(candidate))
    }
}

/// Shared handle to the in-process tables. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemorySession { guard, working }))
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn slot_conflict(event: &Event) -> StoreError {
    StoreError::Conflict(format!(
        "an event '{}' at '{}' is already scheduled for {}",
        event.description, event.location, event.scheduled_time
    ))
}

#[async_trait]
impl Session for MemorySession {
    async fn insert_user(
        &mut self,
        username: &str,
        password_hash: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let state = &mut self.working;
        if state.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }
        state.last_user_id += 1;
        let user = User {
            id: UserId::new(state.last_user_id),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            creation_time,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn insert_event(
        &mut self,
        event: &NewEvent,
        created_by: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        let state = &mut self.working;
        if !state.users.values().any(|u| u.username == created_by) {
            return Err(StoreError::ForeignKey(format!(
                "unknown event owner '{created_by}'"
            )));
        }
        let candidate = Event {
            id: EventId::new(state.last_event_id + 1),
            description: event.description.clone(),
            location: event.location.clone(),
            scheduled_time: event.scheduled_time,
            creation_time,
            popularity: event.popularity,
            created_by: created_by.to_string(),
        };
        if state.slot_taken(&candidate).is_some() {
            return Err(slot_conflict(&candidate));
        }
        state.last_event_id += 1;
        state.events.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn event_by_id(&mut self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.working.events.get(&id).cloned())
    }

    async fn list_events(
        &mut self,
        sort: SortField,
        page: Page,
    ) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self.working.events.values().cloned().collect();
        // `sort_by` is stable, so ties keep id order.
        match sort {
            SortField::ScheduledTime => events.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time)),
            SortField::Popularity => events.sort_by(|a, b| a.popularity.cmp(&b.popularity)),
            SortField::CreationTime => events.sort_by(|a, b| a.creation_time.cmp(&b.creation_time)),
            SortField::Unsorted => {}
        }
        let skip = usize::try_from(page.skip).unwrap_or(0);
        let limit = usize::try_from(page.limit).unwrap_or(0);
        Ok(events.into_iter().skip(skip).take(limit).collect())
    }

    async fn events_at_location(&mut self, location: &str) -> Result<Vec<Event>, StoreError> {
        Ok(self
            .working
            .events
            .values()
            .filter(|e| e.location == location)
            .cloned()
            .collect())
    }

    async fn events_scheduled_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self
            .working
            .events
            .values()
            .filter(|e| e.scheduled_time >= from && e.scheduled_time <= to)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        Ok(events)
    }

    async fn update_event(
        &mut self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, StoreError> {
        let state = &mut self.working;
        let Some(current) = state.events.get(&id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        if state.slot_taken(&updated).is_some() {
            return Err(slot_conflict(&updated));
        }
        state.events.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_event(&mut self, id: EventId) -> Result<bool, StoreError> {
        let state = &mut self.working;
        if state.subscriptions.values().any(|s| s.event_id == id) {
            return Err(StoreError::ForeignKey(format!(
                "event {id} is still referenced by subscriptions"
            )));
        }
        Ok(state.events.remove(&id).is_some())
    }

    async fn insert_subscription(
        &mut self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Subscription, StoreError> {
        let state = &mut self.working;
        if !state.events.contains_key(&event_id) {
            return Err(StoreError::ForeignKey(format!("event {event_id} does not exist")));
        }
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKey(format!("user {user_id} does not exist")));
        }
        if state
            .subscriptions
            .values()
            .any(|s| s.event_id == event_id && s.user_id == user_id)
        {
            return Err(StoreError::Conflict(format!(
                "user {user_id} is already subscribed to event {event_id}"
            )));
        }
        state.last_subscription_id += 1;
        let subscription = Subscription {
            id: SubscriptionId::new(state.last_subscription_id),
            event_id,
            user_id,
            reminded_for: None,
        };
        state
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn subscription(
        &mut self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .working
            .subscriptions
            .values()
            .find(|s| s.event_id == event_id && s.user_id == user_id)
            .cloned())
    }

    async fn delete_subscription(&mut self, id: SubscriptionId) -> Result<bool, StoreError> {
        Ok(self.working.subscriptions.remove(&id).is_some())
    }

    async fn subscriptions_for_event(
        &mut self,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .working
            .subscriptions
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn delete_subscriptions_for_event(
        &mut self,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = &mut self.working.subscriptions;
        let doomed: Vec<SubscriptionId> = subscriptions
            .values()
            .filter(|s| s.event_id == event_id)
            .map(|s| s.id)
            .collect();
        Ok(doomed
            .into_iter()
            .filter_map(|id| subscriptions.remove(&id))
            .collect())
    }

    async fn mark_reminded(
        &mut self,
        id: SubscriptionId,
        scheduled_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(subscription) = self.working.subscriptions.get_mut(&id) {
            subscription.reminded_for = Some(scheduled_time);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemorySession { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_event(description: &str, location: &str, at: DateTime<Utc>) -> NewEvent {
        NewEvent {
            description: description.to_string(),
            location: location.to_string(),
            scheduled_time: at,
            popularity: 0,
        }
    }

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let Ok(user) = session.insert_user("alice", "hash", Utc::now()).await else {
            panic!("insert user failed");
        };
        if session.commit().await.is_err() {
            panic!("commit failed");
        }
        (store, user)
    }

    #[tokio::test]
    async fn uncommitted_changes_are_discarded() {
        let (store, _) = seeded().await;
        let at = Utc::now();
        {
            let Ok(mut session) = store.begin().await else {
                panic!("begin failed");
            };
            let inserted = session
                .insert_event(&new_event("Standup", "Room 1", at), "alice", at)
                .await;
            assert!(inserted.is_ok());
        }

        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let listed = session
            .list_events(SortField::Unsorted, Page::default())
            .await
            .unwrap_or_default();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn duplicate_slot_conflicts() {
        let (store, _) = seeded().await;
        let at = Utc::now();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let first = session
            .insert_event(&new_event("Standup", "Room 1", at), "alice", at)
            .await;
        assert!(first.is_ok());

        let second = session
            .insert_event(&new_event("Standup", "Room 1", at), "alice", at)
            .await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_owner_is_rejected() {
        let store = MemoryStore::new();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let at = Utc::now();
        let result = session
            .insert_event(&new_event("Standup", "Room 1", at), "ghost", at)
            .await;
        assert!(matches!(result, Err(StoreError::ForeignKey(_))));
    }

    #[tokio::test]
    async fn update_into_taken_slot_conflicts() {
        let (store, _) = seeded().await;
        let at = Utc::now();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let _ = session
            .insert_event(&new_event("Standup", "Room 1", at), "alice", at)
            .await;
        let Ok(other) = session
            .insert_event(&new_event("Standup", "Room 2", at), "alice", at)
            .await
        else {
            panic!("insert failed");
        };

        let patch = EventPatch {
            location: Some("Room 1".to_string()),
            ..EventPatch::default()
        };
        let result = session.update_event(other.id, &patch).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn event_with_subscribers_cannot_be_deleted_directly() {
        let (store, user) = seeded().await;
        let at = Utc::now();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let Ok(event) = session
            .insert_event(&new_event("Standup", "Room 1", at), "alice", at)
            .await
        else {
            panic!("insert failed");
        };
        let _ = session.insert_subscription(event.id, user.id).await;

        let blocked = session.delete_event(event.id).await;
        assert!(matches!(blocked, Err(StoreError::ForeignKey(_))));

        let removed = session
            .delete_subscriptions_for_event(event.id)
            .await
            .unwrap_or_default();
        assert_eq!(removed.len(), 1);
        assert!(matches!(session.delete_event(event.id).await, Ok(true)));
    }

    #[tokio::test]
    async fn duplicate_subscription_conflicts() {
        let (store, user) = seeded().await;
        let at = Utc::now();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let Ok(event) = session
            .insert_event(&new_event("Standup", "Room 1", at), "alice", at)
            .await
        else {
            panic!("insert failed");
        };
        assert!(session.insert_subscription(event.id, user.id).await.is_ok());
        let again = session.insert_subscription(event.id, user.id).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_sorts_ascending_and_paginates() {
        let (store, _) = seeded().await;
        let base = Utc::now();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        for (i, popularity) in [30, 10, 20].into_iter().enumerate() {
            let mut event = new_event("Talk", "Hall", base + Duration::hours(i as i64));
            event.popularity = popularity;
            let _ = session.insert_event(&event, "alice", base).await;
        }

        let by_popularity = session
            .list_events(SortField::Popularity, Page::default())
            .await
            .unwrap_or_default();
        let order: Vec<i32> = by_popularity.iter().map(|e| e.popularity).collect();
        assert_eq!(order, vec![10, 20, 30]);

        let second_page = session
            .list_events(SortField::ScheduledTime, Page { skip: 1, limit: 1 })
            .await
            .unwrap_or_default();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page.first().map(|e| e.popularity), Some(10));
    }

    #[tokio::test]
    async fn scheduled_between_is_inclusive() {
        let (store, _) = seeded().await;
        let now = Utc::now();
        let Ok(mut session) = store.begin().await else {
            panic!("begin failed");
        };
        let _ = session
            .insert_event(&new_event("Soon", "A", now + Duration::minutes(30)), "alice", now)
            .await;
        let _ = session
            .insert_event(&new_event("Later", "A", now + Duration::minutes(31)), "alice", now)
            .await;

        let window = session
            .events_scheduled_between(now, now + Duration::minutes(30))
            .await
            .unwrap_or_default();
        assert_eq!(window.len(), 1);
        assert_eq!(window.first().map(|e| e.description.as_str()), Some("Soon"));
    }
}
