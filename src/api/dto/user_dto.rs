//! User and token DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{User, UserId};

/// Request body for `POST /users/`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Unique login name.
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Plaintext password; stored only as an Argon2id hash.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Registration timestamp.
    pub creation_time: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            creation_time: user.creation_time,
        }
    }
}

/// Form body for `POST /token` (OAuth2 password flow).
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Response body for `POST /token`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Signed bearer credential.
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

impl TokenResponse {
    /// Wraps a freshly issued credential.
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}
