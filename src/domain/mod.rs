//! Domain layer: entities, identifiers and the notification system.
//!
//! Users own events, users subscribe to events, and every lifecycle change of
//! a subscribed event produces one [`Notification`] per subscriber on the
//! [`NotificationBus`].

pub mod event;
pub mod ids;
pub mod notification;
pub mod notification_bus;
pub mod subscription;
pub mod user;

pub use event::{Event, EventPatch, NewEvent, Page, SortField};
pub use ids::{EventId, SubscriptionId, UserId};
pub use notification::Notification;
pub use notification_bus::NotificationBus;
pub use subscription::Subscription;
pub use user::User;
