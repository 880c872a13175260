//! Persistence layer: transactional storage for users, events and
//! subscriptions.
//!
//! [`Store`] hands out [`Session`]s. A session is one transaction: every
//! change made through it becomes visible only after [`Session::commit`], and
//! dropping a session without committing rolls it back. This is what keeps
//! single-item mutations and batch calls all-or-nothing.
//!
//! The store enforces the uniqueness constraints (usernames, the event
//! `(description, location, scheduled_time)` triple, one subscription per
//! `(event, user)` pair) and referential integrity, but never cascades:
//! removing an event that still has subscriptions is an error. Callers delete
//! dependents first.
//!
//! Two backends exist: [`PostgresStore`] (`sqlx::PgPool`) and the in-process
//! [`MemoryStore`].

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Event, EventId, EventPatch, NewEvent, Page, SortField, Subscription, SubscriptionId, User,
    UserId,
};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Failure reported by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    /// A row references a parent that does not exist, or a parent still has
    /// dependents.
    #[error("referential integrity violated: {0}")]
    ForeignKey(String),

    /// Connection, protocol or driver failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Entry point of a storage backend.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Opens a new session (transaction).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if no connection can be acquired.
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError>;
}

/// One transaction against the store.
///
/// Dropping the session without calling [`Session::commit`] discards every
/// change made through it.
#[async_trait]
pub trait Session: Send + fmt::Debug {
    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the username is taken.
    async fn insert_user(
        &mut self,
        username: &str,
        password_hash: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<User, StoreError>;

    /// Looks a user up by username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError>;

    /// Looks a user up by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Inserts an event owned by `created_by`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the slot triple is taken and
    /// [`StoreError::ForeignKey`] if `created_by` is not a known username.
    async fn insert_event(
        &mut self,
        event: &NewEvent,
        created_by: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<Event, StoreError>;

    /// Looks an event up by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn event_by_id(&mut self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Lists events in ascending `sort` order (ties by id) within `page`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn list_events(&mut self, sort: SortField, page: Page)
    -> Result<Vec<Event>, StoreError>;

    /// Lists events whose location equals `location` exactly, by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn events_at_location(&mut self, location: &str) -> Result<Vec<Event>, StoreError>;

    /// Lists events with `from <= scheduled_time <= to`, by start time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn events_scheduled_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError>;

    /// Applies `patch` to an event. Returns `None` if the event is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the patched event would collide
    /// with another event's slot.
    async fn update_event(
        &mut self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, StoreError>;

    /// Deletes an event row. Returns `false` if it was absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ForeignKey`] if subscriptions still reference it.
    async fn delete_event(&mut self, id: EventId) -> Result<bool, StoreError>;

    /// Inserts a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the pair already exists and
    /// [`StoreError::ForeignKey`] if the event or user is absent.
    async fn insert_subscription(
        &mut self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Subscription, StoreError>;

    /// Looks up the subscription of `user_id` to `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn subscription(
        &mut self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Deletes one subscription. Returns `false` if it was absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn delete_subscription(&mut self, id: SubscriptionId) -> Result<bool, StoreError>;

    /// Lists the subscriptions of an event, by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn subscriptions_for_event(
        &mut self,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, StoreError>;

    /// Deletes every subscription of an event and returns the removed rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn delete_subscriptions_for_event(
        &mut self,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, StoreError>;

    /// Records that a reminder went out for the event start `scheduled_time`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on driver failure.
    async fn mark_reminded(
        &mut self,
        id: SubscriptionId,
        scheduled_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Makes every change of this session durable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the commit fails; the changes are
    /// then discarded.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
