//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when the store answers, `degraded` otherwise.
    pub status: String,
    /// Whether a store session could be opened.
    pub store_reachable: bool,
    /// Live receivers on the notification bus.
    pub notification_listeners: usize,
    /// Server clock at the time of the check.
    pub timestamp: DateTime<Utc>,
    /// Crate version.
    pub version: String,
}

/// `GET /health`: Store reachability and notification listeners.
///
/// Opens a store session and drops it straight away, so the probe never
/// writes anything.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store_reachable = match state.store.begin().await {
        Ok(_session) => true,
        Err(e) => {
            tracing::warn!(error = %e, "health check could not open a store session");
            false
        }
    };

    let (code, status) = if store_reachable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            store_reachable,
            notification_listeners: state.subscriptions.bus().receiver_count(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
