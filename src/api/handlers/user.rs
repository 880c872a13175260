//! Account handlers: registration and token issuance.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use validator::Validate;

use crate::api::dto::{CreateUserRequest, TokenRequest, TokenResponse, UserResponse};
use crate::api::extract::{ApiForm, ApiJson};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `POST /users/`: Register a user.
///
/// # Errors
///
/// Returns [`ApiError`] if the body is invalid or the username is taken.
#[utoipa::path(
    post,
    path = "/users/",
    tag = "Users",
    summary = "Register a user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Username taken", body = ErrorResponse),
        (status = 422, description = "Invalid body", body = ErrorResponse),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let user = state.accounts.register(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// `POST /token`: Exchange a username and password for a bearer credential.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on bad credentials.
#[utoipa::path(
    post,
    path = "/token",
    tag = "Users",
    summary = "Issue an access token",
    description = "OAuth2 password flow: form-encoded `username` and `password`.",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    ApiForm(req): ApiForm<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.accounts.login(&req.username, &req.password).await?;
    tracing::info!(username = %req.username, "token issued");
    Ok(Json(TokenResponse::bearer(token)))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/", post(create_user))
        .route("/token", post(issue_token))
}
