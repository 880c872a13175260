//! Type-safe row identifiers.
//!
//! Every persisted entity is keyed by a store-assigned `BIGSERIAL`. The
//! newtypes below keep event, user and subscription ids from being mixed up
//! at call sites while serializing as plain integers.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store id.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw store id.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Identifier of a scheduled [`super::Event`].
    EventId
);

row_id!(
    /// Identifier of a registered [`super::User`].
    UserId
);

row_id!(
    /// Identifier of a [`super::Subscription`] row.
    SubscriptionId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_integer() {
        assert_eq!(EventId::new(42).to_string(), "42");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap_or_default();
        assert_eq!(json, "7");

        let Ok(id) = serde_json::from_str::<SubscriptionId>("9") else {
            panic!("deserialization failed");
        };
        assert_eq!(id.get(), 9);
    }

    #[test]
    fn orders_by_raw_value() {
        let mut ids = vec![EventId::new(3), EventId::new(1), EventId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![EventId::new(1), EventId::new(2), EventId::new(3)]);
    }
}
