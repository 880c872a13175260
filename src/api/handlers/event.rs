//! Event CRUD handlers: create, list, get, update, delete, filter, sort.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use validator::Validate;

use crate::api::dto::{CreateEventRequest, ListEventsParams, MessageResponse, UpdateEventRequest};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{Event, EventId, SortField};
use crate::error::{ApiError, ErrorResponse};

/// `POST /events/`: Create an event owned by the caller.
///
/// # Errors
///
/// Returns [`ApiError::Conflict`] if the slot is taken.
#[utoipa::path(
    post,
    path = "/events/",
    tag = "Events",
    summary = "Create an event",
    request_body = CreateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 409, description = "Slot already taken", body = ErrorResponse),
        (status = 422, description = "Invalid body", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let event = state.events.create(req.into(), &user.username).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events/`: List events ordered by start time.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for a bad window.
#[utoipa::path(
    get,
    path = "/events/",
    tag = "Events",
    summary = "List events",
    params(ListEventsParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Events by start time", body = Vec<Event>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Invalid window", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(params): ApiQuery<ListEventsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state
        .events
        .list(params.into(), SortField::ScheduledTime)
        .await?;
    Ok(Json(events))
}

/// `GET /event/{id}`: Fetch one event.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] if absent.
#[utoipa::path(
    get,
    path = "/event/{id}",
    tag = "Events",
    summary = "Get an event",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.get(id).await?;
    Ok(Json(event))
}

/// `PUT /event/{id}`: Partially update an event.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] if absent and [`ApiError::Conflict`]
/// if the update collides with another event.
#[utoipa::path(
    put,
    path = "/event/{id}",
    tag = "Events",
    summary = "Update an event",
    description = "Only the fields present in the body are changed. Subscribers are notified.",
    params(("id" = i64, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Slot already taken", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<EventId>,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let event = state.events.update(id, req.into()).await?;
    Ok(Json(event))
}

/// `DELETE /event/{id}`: Delete an event and its subscriptions.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] if absent.
#[utoipa::path(
    delete,
    path = "/event/{id}",
    tag = "Events",
    summary = "Delete an event",
    description = "Removes the event and every subscription to it. Former subscribers are notified.",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.events.delete(id).await? {
        return Err(ApiError::EventNotFound(id));
    }
    Ok(Json(MessageResponse::new(format!("Event {id} deleted"))))
}

/// `GET /events/location/{location}`: Events at an exact location.
///
/// # Errors
///
/// Returns [`ApiError`] on store failure.
#[utoipa::path(
    get,
    path = "/events/location/{location}",
    tag = "Events",
    summary = "Filter events by location",
    params(("location" = String, Path, description = "Exact location")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matching events", body = Vec<Event>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn events_by_location(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(location): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.events.list_by_location(&location).await?;
    Ok(Json(events))
}

/// `GET /events/sort/{field}`: Events ordered by a field.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for an unknown field or a bad window.
#[utoipa::path(
    get,
    path = "/events/sort/{field}",
    tag = "Events",
    summary = "List events sorted by a field",
    params(
        ("field" = SortField, Path, description = "scheduled_time, popularity or creation_time"),
        ListEventsParams,
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Sorted events", body = Vec<Event>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Unknown field", body = ErrorResponse),
    )
)]
pub async fn sorted_events(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(field): ApiPath<SortField>,
    ApiQuery(params): ApiQuery<ListEventsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.events.list(params.into(), field).await?;
    Ok(Json(events))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/", get(list_events).post(create_event))
        .route(
            "/event/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/location/{location}", get(events_by_location))
        .route("/events/sort/{field}", get(sorted_events))
}
