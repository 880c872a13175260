//! # event-scheduler
//!
//! REST backend for scheduling events, subscribing to them and being
//! reminded before they start.
//!
//! Users register and exchange their password for a short-lived bearer
//! credential. Authenticated callers create, update and delete events (one at
//! a time or in all-or-nothing batches) and subscribe to them. Every change to
//! a subscribed event, and every event about to start, produces one
//! notification per subscriber on the in-process notification bus.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/) ── AuthUser extractor (auth/)
//!     │
//!     ├── AccountService ── CredentialService (auth/)
//!     ├── EventRepository ──┐
//!     ├── SubscriptionManager ── NotificationBus (domain/)
//!     ├── ReminderDispatcher (background task)
//!     │
//!     └── Store / Session (persistence/)
//!             ├── PostgreSQL
//!             └── in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
