//! Batch event handlers: create, update and delete many events in one
//! all-or-nothing call.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use validator::Validate;

use crate::api::dto::{CreateEventRequest, MessageResponse, UpdateEventRequest};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{Event, EventId, EventPatch, NewEvent};
use crate::error::{ApiError, ErrorResponse};

/// Parses a comma-separated id list such as `"1,2,3"`.
fn parse_ids(raw: &str) -> Result<Vec<EventId>, ApiError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map(EventId::new)
                .map_err(|_| ApiError::Validation(format!("invalid event id: {part:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(ApiError::Validation("no event ids given".to_string()));
    }
    Ok(ids)
}

/// `POST /events/batch_create/`: Create several events.
///
/// # Errors
///
/// Returns [`ApiError::Conflict`] if any entry collides; nothing is created.
#[utoipa::path(
    post,
    path = "/events/batch_create/",
    tag = "Batch",
    summary = "Create events in bulk",
    request_body = Vec<CreateEventRequest>,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Events created", body = Vec<Event>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 409, description = "A slot is already taken", body = ErrorResponse),
        (status = 422, description = "Invalid body", body = ErrorResponse),
    )
)]
pub async fn batch_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(reqs): ApiJson<Vec<CreateEventRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    for req in &reqs {
        req.validate()?;
    }
    let batch: Vec<NewEvent> = reqs.into_iter().map(NewEvent::from).collect();
    let events = state.events.batch_create(batch, &user.username).await?;
    Ok((StatusCode::CREATED, Json(events)))
}

/// `PUT /events/batch_update/{ids}`: Update several events.
///
/// The i-th update applies to the i-th id.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] naming the first missing id and
/// [`ApiError::Validation`] if the counts differ; nothing is updated.
#[utoipa::path(
    put,
    path = "/events/batch_update/{ids}",
    tag = "Batch",
    summary = "Update events in bulk",
    params(("ids" = String, Path, description = "Comma-separated event ids")),
    request_body = Vec<UpdateEventRequest>,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated events", body = Vec<Event>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "An event was not found", body = ErrorResponse),
        (status = 422, description = "Invalid ids or body", body = ErrorResponse),
    )
)]
pub async fn batch_update(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(raw_ids): ApiPath<String>,
    ApiJson(reqs): ApiJson<Vec<UpdateEventRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = parse_ids(&raw_ids)?;
    for req in &reqs {
        req.validate()?;
    }
    let patches: Vec<EventPatch> = reqs.into_iter().map(EventPatch::from).collect();
    let events = state.events.batch_update(&ids, patches).await?;
    Ok(Json(events))
}

/// `DELETE /events/batch_delete/{ids}`: Delete several events.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] naming the first missing id; nothing
/// is deleted.
#[utoipa::path(
    delete,
    path = "/events/batch_delete/{ids}",
    tag = "Batch",
    summary = "Delete events in bulk",
    params(("ids" = String, Path, description = "Comma-separated event ids")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Events deleted", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "An event was not found", body = ErrorResponse),
        (status = 422, description = "Invalid ids", body = ErrorResponse),
    )
)]
pub async fn batch_delete(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(raw_ids): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = parse_ids(&raw_ids)?;
    let deleted = state.events.batch_delete(&ids).await?;
    let listed = deleted
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Ok(Json(MessageResponse::new(format!("Events {listed} deleted"))))
}

/// Batch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/batch_create/", post(batch_create))
        .route("/events/batch_update/{ids}", put(batch_update))
        .route("/events/batch_delete/{ids}", delete(batch_delete))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        let Ok(ids) = parse_ids("1, 2,3") else {
            panic!("valid ids");
        };
        assert_eq!(ids, [EventId::new(1), EventId::new(2), EventId::new(3)]);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        assert!(matches!(parse_ids("1,abc"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(parse_ids(" , "), Err(ApiError::Validation(_))));
    }
}
