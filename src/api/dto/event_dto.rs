//! Event DTOs for create, update, list and delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{EventPatch, NewEvent, Page};

/// Request body for `POST /events/` and each entry of a batch create.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateEventRequest {
    /// Free-text description.
    #[validate(length(min = 1))]
    pub description: String,
    /// Location.
    #[validate(length(min = 1))]
    pub location: String,
    /// Start time. RFC 3339, or a naive date-time read as UTC.
    #[serde(deserialize_with = "start_time::required")]
    pub scheduled_time: DateTime<Utc>,
    /// Participant count. Defaults to 0.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub popularity: i32,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            description: req.description,
            location: req.location,
            scheduled_time: req.scheduled_time,
            popularity: req.popularity,
        }
    }
}

/// Request body for `PUT /event/{id}` and each entry of a batch update.
///
/// Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateEventRequest {
    /// New description.
    #[validate(length(min = 1))]
    pub description: Option<String>,
    /// New location.
    #[validate(length(min = 1))]
    pub location: Option<String>,
    /// New start time. RFC 3339, or a naive date-time read as UTC.
    #[serde(default, deserialize_with = "start_time::optional")]
    pub scheduled_time: Option<DateTime<Utc>>,
    /// New participant count.
    #[validate(range(min = 0))]
    pub popularity: Option<i32>,
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            description: req.description,
            location: req.location,
            scheduled_time: req.scheduled_time,
            popularity: req.popularity,
        }
    }
}

/// Start times arrive either with an offset or as a bare local date-time.
/// The latter is taken to be UTC.
mod start_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(at) = raw.parse::<DateTime<Utc>>() {
            return Ok(at);
        }
        raw.parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid scheduled_time {raw:?}: {e}"))
    }

    pub(super) fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub(super) fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

/// Pagination query for event listings.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEventsParams {
    /// Rows to skip. Defaults to 0.
    #[serde(default)]
    pub skip: i64,
    /// Maximum rows to return. Defaults to 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    Page::DEFAULT_LIMIT
}

impl From<ListEventsParams> for Page {
    fn from(params: ListEventsParams) -> Self {
        Self {
            skip: params.skip,
            limit: params.limit,
        }
    }
}

/// Plain confirmation body.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Builds a response from any displayable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn popularity_defaults_to_zero() {
        let body = r#"{"description":"Standup","location":"Room 1","scheduled_time":"2026-03-01T09:00:00Z"}"#;
        let Ok(req) = serde_json::from_str::<CreateEventRequest>(body) else {
            panic!("valid body");
        };
        assert_eq!(req.popularity, 0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_description_fails_validation() {
        let body = r#"{"description":"","location":"Room 1","scheduled_time":"2026-03-01T09:00:00Z"}"#;
        let Ok(req) = serde_json::from_str::<CreateEventRequest>(body) else {
            panic!("valid body");
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_keeps_absent_fields_absent() {
        let Ok(req) = serde_json::from_str::<UpdateEventRequest>(r#"{"popularity":3}"#) else {
            panic!("valid body");
        };
        let patch = EventPatch::from(req);
        assert_eq!(patch.popularity, Some(3));
        assert!(patch.description.is_none());
        assert!(patch.scheduled_time.is_none());
    }

    #[test]
    fn scheduled_time_accepts_offset_and_naive_forms() {
        let Ok(expected) = "2026-03-01T09:00:00Z".parse::<DateTime<Utc>>() else {
            panic!("valid instant");
        };
        for stamp in [
            "2026-03-01T09:00:00Z",
            "2026-03-01T10:00:00+01:00",
            "2026-03-01T09:00:00",
        ] {
            let body = format!(
                r#"{{"description":"Standup","location":"Room 1","scheduled_time":"{stamp}","popularity":5}}"#
            );
            let Ok(req) = serde_json::from_str::<CreateEventRequest>(&body) else {
                panic!("{stamp} should be accepted");
            };
            assert_eq!(req.scheduled_time, expected);
            assert_eq!(req.popularity, 5);
        }

        let Ok(update) =
            serde_json::from_str::<UpdateEventRequest>(r#"{"scheduled_time":"2026-03-01T09:00:00"}"#)
        else {
            panic!("naive update should be accepted");
        };
        assert_eq!(update.scheduled_time, Some(expected));
    }

    #[test]
    fn scheduled_time_rejects_garbage() {
        let body = r#"{"description":"Standup","location":"Room 1","scheduled_time":"tomorrow"}"#;
        assert!(serde_json::from_str::<CreateEventRequest>(body).is_err());
        let body = r#"{"scheduled_time":null}"#;
        let Ok(update) = serde_json::from_str::<UpdateEventRequest>(body) else {
            panic!("null keeps the field absent");
        };
        assert!(update.scheduled_time.is_none());
    }

    #[test]
    fn negative_popularity_fails_validation() {
        let req = UpdateEventRequest {
            popularity: Some(-1),
            ..UpdateEventRequest::default()
        };
        assert!(req.validate().is_err());
    }
}
