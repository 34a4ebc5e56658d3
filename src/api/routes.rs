//! API routes

use crate::api::handlers::{
    by_genre, details, discover, health_check, popular, search, trending, AppState,
};
use crate::auth::{authenticate, get_me, login, register};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Routes reachable without a token
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .with_state(state)
}

/// Routes behind the auth gate
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/movies/trending", get(trending))
        .route("/api/movies/popular", get(popular))
        .route("/api/movies/search", get(search))
        .route("/api/movies/discover", get(discover))
        .route("/api/movies/genres/:id", get(by_genre))
        .route("/api/movies/:id", get(details))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            authenticate,
        ))
        .with_state(state)
}
