//! PostgreSQL implementation of the persistence layer.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{EventRow, SubscriptionRow, UserRow};
use super::{Session, Store, StoreError};
use crate::config::SchedulerConfig;
use crate::domain::{
    Event, EventId, EventPatch, NewEvent, Page, SortField, Subscription, SubscriptionId, User,
    UserId,
};

const EVENT_COLUMNS: &str =
    "id, description, location, scheduled_time, creation_time, popularity, created_by";

const SUBSCRIPTION_COLUMNS: &str = "id, event_id, user_id, reminded_for";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.is_unique_violation() {
                return Self::Conflict(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return Self::ForeignKey(db.message().to_string());
            }
        }
        Self::Backend(err.to_string())
    }
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with the pool settings from `config` and
    /// applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the connection or a migration fails.
    pub async fn connect(config: &SchedulerConfig, database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::info!(
            max_connections = config.database_max_connections,
            "connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresSession { tx }))
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back on drop unless
/// committed.
pub struct PostgresSession {
    tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn insert_user(
        &mut self,
        username: &str,
        password_hash: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash, creation_time) VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash, creation_time",
        )
        .bind(username)
        .bind(password_hash)
        .bind(creation_time)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, creation_time FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(User::from))
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, creation_time FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(User::from))
    }

    async fn insert_event(
        &mut self,
        event: &NewEvent,
        created_by: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        let sql = format!(
            "INSERT INTO events (description, location, scheduled_time, creation_time, popularity, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(&event.description)
            .bind(&event.location)
            .bind(event.scheduled_time)
            .bind(creation_time)
            .bind(event.popularity)
            .bind(created_by)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.into())
    }

    async fn event_by_id(&mut self, id: EventId) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Event::from))
    }

    async fn list_events(
        &mut self,
        sort: SortField,
        page: Page,
    ) -> Result<Vec<Event>, StoreError> {
        let order_by = match sort {
            SortField::ScheduledTime => "scheduled_time, id",
            SortField::Popularity => "popularity, id",
            SortField::CreationTime => "creation_time, id",
            SortField::Unsorted => "id",
        };
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY {order_by} OFFSET $1 LIMIT $2"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn events_at_location(&mut self, location: &str) -> Result<Vec<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE location = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(location)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn events_scheduled_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE scheduled_time >= $1 AND scheduled_time <= $2 ORDER BY scheduled_time, id"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn update_event(
        &mut self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, StoreError> {
        // COALESCE keeps the stored value for every field the patch omits.
        let sql = format!(
            "UPDATE events SET \
             description = COALESCE($2, description), \
             location = COALESCE($3, location), \
             scheduled_time = COALESCE($4, scheduled_time), \
             popularity = COALESCE($5, popularity) \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.get())
            .bind(patch.description.as_deref())
            .bind(patch.location.as_deref())
            .bind(patch.scheduled_time)
            .bind(patch.popularity)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Event::from))
    }

    async fn delete_event(&mut self, id: EventId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_subscription(
        &mut self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Subscription, StoreError> {
        let sql = format!(
            "INSERT INTO subscriptions (event_id, user_id) VALUES ($1, $2) \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(event_id.get())
            .bind(user_id.get())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.into())
    }

    async fn subscription(
        &mut self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Subscription>, StoreError> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE event_id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(event_id.get())
            .bind(user_id.get())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Subscription::from))
    }

    async fn delete_subscription(&mut self, id: SubscriptionId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn subscriptions_for_event(
        &mut self,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, StoreError> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE event_id = $1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(event_id.get())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn delete_subscriptions_for_event(
        &mut self,
        event_id: EventId,
    ) -> Result<Vec<Subscription>, StoreError> {
        let sql = format!(
            "DELETE FROM subscriptions WHERE event_id = $1 RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(event_id.get())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn mark_reminded(
        &mut self,
        id: SubscriptionId,
        scheduled_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE subscriptions SET reminded_for = $2 WHERE id = $1")
            .bind(id.get())
            .bind(scheduled_time)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
