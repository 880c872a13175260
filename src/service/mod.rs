//! Service layer: business logic orchestration.
//!
//! [`EventRepository`] owns event CRUD, [`SubscriptionManager`] owns
//! subscriptions and notification fan-out, [`AccountService`] owns users and
//! credentials, and [`ReminderDispatcher`] runs the periodic reminder scan.

pub mod account_service;
pub mod event_repository;
pub mod reminder_dispatcher;
pub mod subscription_manager;

pub use account_service::AccountService;
pub use event_repository::EventRepository;
pub use reminder_dispatcher::ReminderDispatcher;
pub use subscription_manager::SubscriptionManager;
