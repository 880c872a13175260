//! event-scheduler server entry point.
//!
//! Starts the Axum HTTP server and the reminder dispatcher.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use event_scheduler::api;
use event_scheduler::app_state::AppState;
use event_scheduler::auth::CredentialService;
use event_scheduler::config::{LogFormat, SchedulerConfig};
use event_scheduler::domain::NotificationBus;
use event_scheduler::persistence::{MemoryStore, PostgresStore, Store};
use event_scheduler::service::ReminderDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = SchedulerConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting event-scheduler");

    // Select the store
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PostgresStore::connect(&config, url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    // Credentials
    let credentials = match &config.jwt_secret {
        Some(secret) => CredentialService::new(secret.as_bytes(), config.access_token_ttl()),
        None => {
            tracing::info!("JWT_SECRET not set, tokens do not survive a restart");
            CredentialService::with_random_secret(config.access_token_ttl())
        }
    };

    // Build application state
    let bus = NotificationBus::new(config.notification_bus_capacity);
    let app_state = AppState::new(store, credentials, bus);

    // Start the reminder dispatcher
    let shutdown = CancellationToken::new();
    let dispatcher = ReminderDispatcher::new(
        app_state.events.clone(),
        app_state.subscriptions.clone(),
        config.reminder_interval(),
        config.reminder_lookahead(),
    );
    let dispatcher_task = tokio::spawn(dispatcher.run(shutdown.clone()));

    // Build router
    let app = Router::new().merge(api::build_router());
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                )))
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    dispatcher_task.await?;

    Ok(())
}
