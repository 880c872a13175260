//! Event repository: CRUD and batch CRUD over events.
//!
//! Every call runs inside exactly one store session, so a failing call
//! (single or batch) leaves the store exactly as it found it. Subscriber
//! notifications are sent only after the session has committed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::SubscriptionManager;
use crate::domain::{Event, EventId, EventPatch, NewEvent, Page, SortField, Subscription};
use crate::error::ApiError;
use crate::persistence::{Store, StoreError};

/// Message returned when an event would occupy a taken slot.
const SLOT_TAKEN: &str = "an event with this description, location and scheduled time already exists";

/// Maps a uniqueness violation on the event triple to a stable message.
fn slot_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => ApiError::Conflict(SLOT_TAKEN.to_string()),
        other => other.into(),
    }
}

/// Transactional access to events.
#[derive(Debug, Clone)]
pub struct EventRepository {
    store: Arc<dyn Store>,
    subscriptions: SubscriptionManager,
}

impl EventRepository {
    /// Creates a new `EventRepository`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, subscriptions: SubscriptionManager) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    /// Creates an event owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] if another event occupies the same
    /// `(description, location, scheduled_time)` slot.
    pub async fn create(&self, fields: NewEvent, owner: &str) -> Result<Event, ApiError> {
        let mut session = self.store.begin().await?;
        let event = session
            .insert_event(&fields, owner, Utc::now())
            .await
            .map_err(slot_error)?;
        session.commit().await?;

        tracing::info!(event_id = %event.id, created_by = owner, "event created");
        Ok(event)
    }

    /// Fetches one event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if it does not exist.
    pub async fn get(&self, id: EventId) -> Result<Event, ApiError> {
        let mut session = self.store.begin().await?;
        session
            .event_by_id(id)
            .await?
            .ok_or(ApiError::EventNotFound(id))
    }

    /// Lists events in ascending `sort` order within `page`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a negative `skip` or a
    /// non-positive `limit`.
    pub async fn list(&self, page: Page, sort: SortField) -> Result<Vec<Event>, ApiError> {
        if !page.is_valid() {
            return Err(ApiError::Validation(format!(
                "skip must be >= 0 and limit must be > 0 (got skip={}, limit={})",
                page.skip, page.limit
            )));
        }
        let mut session = self.store.begin().await?;
        Ok(session.list_events(sort, page).await?)
    }

    /// Lists events whose location matches exactly, ordered by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_by_location(&self, location: &str) -> Result<Vec<Event>, ApiError> {
        let mut session = self.store.begin().await?;
        Ok(session.events_at_location(location).await?)
    }

    /// Events starting within `[now, now + window]`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn upcoming(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Event>, ApiError> {
        let mut session = self.store.begin().await?;
        Ok(session.events_scheduled_between(now, now + window).await?)
    }

    /// Applies `patch` to an event and notifies its subscribers.
    ///
    /// An empty patch returns the event unchanged and notifies nobody.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event is absent and
    /// [`ApiError::Conflict`] if the patched event would collide with another.
    pub async fn update(&self, id: EventId, patch: EventPatch) -> Result<Event, ApiError> {
        let mut session = self.store.begin().await?;
        let event = session
            .update_event(id, &patch)
            .await
            .map_err(slot_error)?
            .ok_or(ApiError::EventNotFound(id))?;
        let subscribers = if patch.is_empty() {
            Vec::new()
        } else {
            session.subscriptions_for_event(id).await?
        };
        session.commit().await?;

        let notified = self.subscriptions.notify_on_update(&event, &subscribers);
        tracing::info!(event_id = %id, notified, "event updated");
        Ok(event)
    }

    /// Deletes an event together with its subscriptions.
    ///
    /// Returns `false` if the event did not exist.
    ///
    /// # Errors
    ///
    /// Propagates store failures; nothing is deleted in that case.
    pub async fn delete(&self, id: EventId) -> Result<bool, ApiError> {
        let mut session = self.store.begin().await?;
        if session.event_by_id(id).await?.is_none() {
            return Ok(false);
        }
        let removed = self.subscriptions.cascade_on_delete(&mut *session, id).await?;
        session.delete_event(id).await?;
        session.commit().await?;

        let notified = self.subscriptions.notify_on_delete(id, &removed);
        tracing::info!(event_id = %id, notified, "event deleted");
        Ok(true)
    }

    /// Creates every event or none.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] if any event collides with a stored one
    /// or with an earlier entry of the same batch.
    pub async fn batch_create(
        &self,
        batch: Vec<NewEvent>,
        owner: &str,
    ) -> Result<Vec<Event>, ApiError> {
        let mut session = self.store.begin().await?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(batch.len());
        for fields in &batch {
            let event = session
                .insert_event(fields, owner, now)
                .await
                .map_err(slot_error)?;
            created.push(event);
        }
        session.commit().await?;

        tracing::info!(count = created.len(), created_by = owner, "events batch created");
        Ok(created)
    }

    /// Applies `patches[i]` to `ids[i]` for every `i`, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if the two lists differ in length,
    /// [`ApiError::EventNotFound`] naming the first missing id and
    /// [`ApiError::Conflict`] on a slot collision. No event changes in any of
    /// these cases.
    pub async fn batch_update(
        &self,
        ids: &[EventId],
        patches: Vec<EventPatch>,
    ) -> Result<Vec<Event>, ApiError> {
        if ids.len() != patches.len() {
            return Err(ApiError::Validation(format!(
                "got {} ids but {} updates",
                ids.len(),
                patches.len()
            )));
        }

        let mut session = self.store.begin().await?;
        let mut updated: Vec<(Event, Vec<Subscription>)> = Vec::with_capacity(ids.len());
        for (&id, patch) in ids.iter().zip(&patches) {
            let event = session
                .update_event(id, patch)
                .await
                .map_err(slot_error)?
                .ok_or(ApiError::EventNotFound(id))?;
            let subscribers = if patch.is_empty() {
                Vec::new()
            } else {
                session.subscriptions_for_event(id).await?
            };
            updated.push((event, subscribers));
        }
        session.commit().await?;

        let mut notified = 0;
        for (event, subscribers) in &updated {
            notified += self.subscriptions.notify_on_update(event, subscribers);
        }
        tracing::info!(count = updated.len(), notified, "events batch updated");
        Ok(updated.into_iter().map(|(event, _)| event).collect())
    }

    /// Deletes every listed event (and its subscriptions), all or nothing.
    ///
    /// Duplicate ids are collapsed. Returns the deleted ids in request order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] naming the first id (in request
    /// order) that does not exist; nothing is deleted in that case.
    pub async fn batch_delete(&self, ids: &[EventId]) -> Result<Vec<EventId>, ApiError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let ids: Vec<EventId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut session = self.store.begin().await?;
        for &id in &ids {
            if session.event_by_id(id).await?.is_none() {
                return Err(ApiError::EventNotFound(id));
            }
        }

        let mut removed = Vec::with_capacity(ids.len());
        for &id in &ids {
            let subscribers = self.subscriptions.cascade_on_delete(&mut *session, id).await?;
            session.delete_event(id).await?;
            removed.push((id, subscribers));
        }
        session.commit().await?;

        let mut notified = 0;
        for (id, subscribers) in &removed {
            notified += self.subscriptions.notify_on_delete(*id, subscribers);
        }
        tracing::info!(count = ids.len(), notified, "events batch deleted");
        Ok(ids)
    }
}
