//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type of the service. Repository and
//! manager operations return it; the HTTP layer renders each variant with a
//! fixed HTTP status and the structured JSON body below.

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventId, UserId};
use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "event 7 not found",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                  |
/// |-----------|-----------------------|------------------------------|
/// | 1000–1099 | Validation            | 422 Unprocessable Entity     |
/// | 1100–1199 | Authentication        | 401 Unauthorized             |
/// | 2000–2099 | Not Found             | 404 Not Found                |
/// | 2100–2199 | Conflict              | 409 Conflict                 |
/// | 3000–3999 | Server                | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, expired or otherwise unusable credential.
    #[error("Invalid credentials")]
    Unauthorized,

    /// Event with the given id does not exist.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// User with the given id does not exist.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The user holds no subscription to the event.
    #[error("user {user_id} is not subscribed to event {event_id}")]
    SubscriptionNotFound {
        /// Event that was looked up.
        event_id: EventId,
        /// User that was looked up.
        user_id: UserId,
    },

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or incomplete input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Unauthorized => 1101,
            Self::EventNotFound(_) => 2001,
            Self::UserNotFound(_) => 2002,
            Self::SubscriptionNotFound { .. } => 2003,
            Self::Conflict(_) => 2101,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::EventNotFound(_) | Self::UserNotFound(_) | Self::SubscriptionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::ForeignKey(msg) | StoreError::Backend(msg) => Self::Persistence(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_message_is_fixed() {
        let err = ApiError::Unauthorized;
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::EventNotFound(EventId::new(1)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("dup".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Validation("bad".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = ApiError::EventNotFound(EventId::new(999));
        assert_eq!(err.to_string(), "event 999 not found");
    }

    #[test]
    fn store_errors_translate() {
        let conflict: ApiError = StoreError::Conflict("taken".to_string()).into();
        assert!(matches!(conflict, ApiError::Conflict(_)));

        let backend: ApiError = StoreError::Backend("down".to_string()).into();
        assert_eq!(backend.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let dangling: ApiError = StoreError::ForeignKey("event 3 does not exist".to_string()).into();
        assert!(matches!(dangling, ApiError::Persistence(_)));
        assert_ne!(dangling.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn response_carries_status() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            response
                .headers()
                .contains_key(axum::http::header::WWW_AUTHENTICATE)
        );
    }
}
