//! Database row models for users, events and subscriptions.

use chrono::{DateTime, Utc};

use crate::domain::{Event, EventId, Subscription, SubscriptionId, User, UserId};

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// `BIGSERIAL` primary key.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Registration timestamp.
    pub creation_time: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            username: row.username,
            password_hash: row.password_hash,
            creation_time: row.creation_time,
        }
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// `BIGSERIAL` primary key.
    pub id: i64,
    /// Free-text description.
    pub description: String,
    /// Location.
    pub location: String,
    /// Start time.
    pub scheduled_time: DateTime<Utc>,
    /// Server-side creation timestamp.
    pub creation_time: DateTime<Utc>,
    /// Participant count.
    pub popularity: i32,
    /// Owning username (FK → `users.username`).
    pub created_by: String,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::new(row.id),
            description: row.description,
            location: row.location,
            scheduled_time: row.scheduled_time,
            creation_time: row.creation_time,
            popularity: row.popularity,
            created_by: row.created_by,
        }
    }
}

/// A row from the `subscriptions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRow {
    /// `BIGSERIAL` primary key.
    pub id: i64,
    /// FK → `events.id`.
    pub event_id: i64,
    /// FK → `users.id`.
    pub user_id: i64,
    /// Event start the last reminder was sent for.
    pub reminded_for: Option<DateTime<Utc>>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: SubscriptionId::new(row.id),
            event_id: EventId::new(row.event_id),
            user_id: UserId::new(row.user_id),
            reminded_for: row.reminded_for,
        }
    }
}
