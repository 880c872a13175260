//! REST API layer: route handlers, DTOs, extractors and router composition.
//!
//! Every event and subscription endpoint requires an
//! `Authorization: Bearer <token>` header; `/users/`, `/token` and `/health`
//! are public.

pub mod dto;
pub mod extract;
pub mod handlers;

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes())
}

/// OpenAPI document for the REST API.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "event-scheduler", description = "Event scheduling with subscriptions and reminders"),
    paths(
        handlers::system::health_handler,
        handlers::user::create_user,
        handlers::user::issue_token,
        handlers::event::create_event,
        handlers::event::list_events,
        handlers::event::get_event,
        handlers::event::update_event,
        handlers::event::delete_event,
        handlers::event::events_by_location,
        handlers::event::sorted_events,
        handlers::batch::batch_create,
        handlers::batch::batch_update,
        handlers::batch::batch_delete,
        handlers::subscription::subscribe,
        handlers::subscription::unsubscribe,
        handlers::subscription::list_subscribers,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Users", description = "Registration and tokens"),
        (name = "Events", description = "Event CRUD"),
        (name = "Batch", description = "All-or-nothing bulk operations"),
        (name = "Subscriptions", description = "Event subscriptions"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
