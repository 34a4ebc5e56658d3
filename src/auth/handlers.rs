//! Authentication API handlers

use crate::api::handlers::AppState;
use crate::auth::middleware::AuthUser;
use crate::auth::models::{AuthResponse, LoginRequest, RegisterRequest, UserInfo};
use crate::core::error::{GatewayError, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))
}

/// Handler for POST /api/auth/register - User registration
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = json_body(body)?;
    tracing::info!(username = %req.username, "User registration attempt");

    let session = state
        .auth
        .register(&req.email, &req.username, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

/// Handler for POST /api/auth/login - User login
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let req = json_body(body)?;

    let session = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse::from(session)))
}

/// Handler for GET /api/me - Get current user info
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> Result<Json<UserInfo>> {
    let db_user = state
        .auth
        .store()
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("User {}", user.id)))?;

    Ok(Json(UserInfo::from(db_user)))
}
