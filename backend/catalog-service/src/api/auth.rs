use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use crypto_core::jwt::AccessToken;
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::extract::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::models::UserResponse;
use crate::validators::{validate_not_blank, validate_username};
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 50, message = "must be 3 to 50 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 255, message = "must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub username: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state
        .auth_service()
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<AccessToken>> {
    let token = state
        .auth_service()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(token))
}

async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
