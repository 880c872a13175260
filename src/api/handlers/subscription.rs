//! Subscription handlers: subscribe, unsubscribe, list subscribers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::extract::ApiPath;
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{EventId, Subscription};
use crate::error::{ApiError, ErrorResponse};

/// `POST /events/{id}/subscribe`: Subscribe the caller to an event.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] if the event is absent.
#[utoipa::path(
    post,
    path = "/events/{id}/subscribe",
    tag = "Subscriptions",
    summary = "Subscribe to an event",
    description = "Idempotent: subscribing twice returns the existing subscription.",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Subscribed", body = Subscription),
        (status = 200, description = "Already subscribed", body = Subscription),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let (subscription, created) = state.subscriptions.subscribe(event_id, user.user_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(subscription)))
}

/// `DELETE /events/{id}/unsubscribe`: Remove the caller's subscription.
///
/// # Errors
///
/// Returns [`ApiError::SubscriptionNotFound`] if the caller is not
/// subscribed.
#[utoipa::path(
    delete,
    path = "/events/{id}/unsubscribe",
    tag = "Subscriptions",
    summary = "Unsubscribe from an event",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Removed subscription", body = Subscription),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Not subscribed", body = ErrorResponse),
    )
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .subscriptions
        .unsubscribe(event_id, user.user_id)
        .await?;
    Ok(Json(removed))
}

/// `GET /events/{id}/subscribers`: List an event's subscriptions.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] if the event is absent.
#[utoipa::path(
    get,
    path = "/events/{id}/subscribers",
    tag = "Subscriptions",
    summary = "List subscribers",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Subscriptions of the event", body = Vec<Subscription>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_subscribers(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let subscribers = state.subscriptions.list_subscribers(event_id).await?;
    Ok(Json(subscribers))
}

/// Subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/subscribe", post(subscribe))
        .route("/events/{id}/unsubscribe", delete(unsubscribe))
        .route("/events/{id}/subscribers", get(list_subscribers))
}
