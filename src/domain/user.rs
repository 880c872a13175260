//! Registered users.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::UserId;

/// A stored user row.
///
/// `password_hash` is an Argon2id PHC string and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Argon2id PHC hash of the password.
    #[serde(skip)]
    pub password_hash: String,
    /// Registration timestamp.
    pub creation_time: DateTime<Utc>,
}
