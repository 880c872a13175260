//! Scheduled events, their creation payload and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventId;

/// A stored event row.
///
/// The triple `(description, location, scheduled_time)` is unique across all
/// events; the store rejects a second row occupying the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Free-text description (e.g. `"Standup"`).
    pub description: String,
    /// Where the event takes place (e.g. `"Room 1"`).
    pub location: String,
    /// When the event starts.
    pub scheduled_time: DateTime<Utc>,
    /// Server-side creation timestamp.
    pub creation_time: DateTime<Utc>,
    /// Participant count.
    pub popularity: i32,
    /// Username of the creating user.
    pub created_by: String,
}

impl Event {
    /// Returns `true` if both events occupy the same
    /// `(description, location, scheduled_time)` slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.description == other.description
            && self.location == other.location
            && self.scheduled_time == other.scheduled_time
    }
}

/// Caller-supplied fields for a new event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Free-text description.
    pub description: String,
    /// Location of the event.
    pub location: String,
    /// Start time.
    pub scheduled_time: DateTime<Utc>,
    /// Initial participant count.
    pub popularity: i32,
}

/// Partial update: only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    /// New description, if changing.
    pub description: Option<String>,
    /// New location, if changing.
    pub location: Option<String>,
    /// New start time, if changing.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// New participant count, if changing.
    pub popularity: Option<i32>,
}

impl EventPatch {
    /// Returns `true` if the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.location.is_none()
            && self.scheduled_time.is_none()
            && self.popularity.is_none()
    }

    /// Applies the present fields to `event`, leaving the rest untouched.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(description) = &self.description {
            event.description.clone_from(description);
        }
        if let Some(location) = &self.location {
            event.location.clone_from(location);
        }
        if let Some(scheduled_time) = self.scheduled_time {
            event.scheduled_time = scheduled_time;
        }
        if let Some(popularity) = self.popularity {
            event.popularity = popularity;
        }
    }
}

/// Ordering applied by event listings. Always ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Order by start time.
    #[default]
    ScheduledTime,
    /// Order by participant count.
    Popularity,
    /// Order by server creation time.
    CreationTime,
    /// Storage order.
    #[serde(skip)]
    Unsorted,
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of rows to skip. Must not be negative.
    pub skip: i64,
    /// Maximum number of rows to return. Must be positive.
    pub limit: i64,
}

impl Page {
    /// Default page size used when the caller does not ask for one.
    pub const DEFAULT_LIMIT: i64 = 100;

    /// Returns `true` if the window is usable (`skip >= 0`, `limit > 0`).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.skip >= 0 && self.limit > 0
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn standup() -> Event {
        let Some(at) = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single() else {
            panic!("valid timestamp");
        };
        Event {
            id: EventId::new(1),
            description: "Standup".to_string(),
            location: "Room 1".to_string(),
            scheduled_time: at,
            creation_time: at,
            popularity: 5,
            created_by: "alice".to_string(),
        }
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut event = standup();
        let before = event.clone();
        let patch = EventPatch {
            popularity: Some(12),
            ..EventPatch::default()
        };

        patch.apply_to(&mut event);

        assert_eq!(event.popularity, 12);
        assert_eq!(event.description, before.description);
        assert_eq!(event.location, before.location);
        assert_eq!(event.scheduled_time, before.scheduled_time);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(EventPatch::default().is_empty());
        let patch = EventPatch {
            location: Some("Room 2".to_string()),
            ..EventPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn same_slot_ignores_popularity_and_owner() {
        let a = standup();
        let mut b = standup();
        b.id = EventId::new(2);
        b.popularity = 0;
        b.created_by = "bob".to_string();
        assert!(a.same_slot(&b));

        b.location = "Room 2".to_string();
        assert!(!a.same_slot(&b));
    }

    #[test]
    fn sort_field_parses_snake_case() {
        let Ok(field) = serde_json::from_str::<SortField>("\"creation_time\"") else {
            panic!("valid sort field");
        };
        assert_eq!(field, SortField::CreationTime);
        assert!(serde_json::from_str::<SortField>("\"unsorted\"").is_err());
    }

    #[test]
    fn page_validation() {
        assert!(Page::default().is_valid());
        assert!(!Page { skip: -1, limit: 10 }.is_valid());
        assert!(!Page { skip: 0, limit: 0 }.is_valid());
    }
}
