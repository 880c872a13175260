//! Bearer-credential extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::ApiError;

/// Caller identified by the `Authorization: Bearer <token>` header.
///
/// Rejects with [`ApiError::Unauthorized`] when the header is missing or
/// malformed, the credential is invalid or expired, or its subject no longer
/// names a stored user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Id of the authenticated user.
    pub user_id: UserId,
    /// Username carried in the credential.
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let user = state.accounts.resolve(token).await?;

        Ok(Self {
            user_id: user.id,
            username: user.username,
        })
    }
}
