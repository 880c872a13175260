//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::CredentialService;
use crate::domain::NotificationBus;
use crate::persistence::Store;
use crate::service::{AccountService, EventRepository, SubscriptionManager};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Users and credentials.
    pub accounts: AccountService,
    /// Event CRUD.
    pub events: EventRepository,
    /// Subscriptions and notification fan-out.
    pub subscriptions: SubscriptionManager,
    /// Backing store, probed by the health check.
    pub store: Arc<dyn Store>,
}

impl AppState {
    /// Wires the services over one store and one notification bus.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, credentials: CredentialService, bus: NotificationBus) -> Self {
        let subscriptions = SubscriptionManager::new(Arc::clone(&store), bus);
        let events = EventRepository::new(Arc::clone(&store), subscriptions.clone());
        let accounts = AccountService::new(Arc::clone(&store), credentials);
        Self {
            accounts,
            events,
            subscriptions,
            store,
        }
    }
}
