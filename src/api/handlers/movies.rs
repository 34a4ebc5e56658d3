//! Catalog proxy handlers
//!
//! All routes here sit behind the auth gate.

use crate::api::handlers::AppState;
use crate::catalog::{Movie, MovieResponse};
use crate::core::error::{GatewayError, Result};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;

const DEFAULT_PAGE: u32 = 1;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    #[serde(default)]
    pub genre: String,
}

fn query<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(value)| value)
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))
}

fn path_id(path: std::result::Result<Path<u64>, PathRejection>) -> Result<u64> {
    path.map(|Path(id)| id)
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))
}

/// Handler for GET /api/movies/trending
pub async fn trending(State(state): State<AppState>) -> Result<Json<MovieResponse>> {
    Ok(Json(state.catalog.trending().await?))
}

/// Handler for GET /api/movies/popular?page=
pub async fn popular(
    State(state): State<AppState>,
    params: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<MovieResponse>> {
    let page = query(params)?.page.unwrap_or(DEFAULT_PAGE);
    Ok(Json(state.catalog.popular(page).await?))
}

/// Handler for GET /api/movies/search?query=
pub async fn search(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<MovieResponse>> {
    let params = query(params)?;
    Ok(Json(state.catalog.search(&params.query).await?))
}

/// Handler for GET /api/movies/discover?genre=
pub async fn discover(
    State(state): State<AppState>,
    params: std::result::Result<Query<DiscoverQuery>, QueryRejection>,
) -> Result<Json<MovieResponse>> {
    let params = query(params)?;
    Ok(Json(state.catalog.discover(&params.genre).await?))
}

/// Handler for GET /api/movies/:id
pub async fn details(
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<Movie>> {
    let id = path_id(id)?;
    Ok(Json(state.catalog.details(id).await?))
}

/// Handler for GET /api/movies/genres/:id?page=
pub async fn by_genre(
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
    params: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<MovieResponse>> {
    let id = path_id(id)?;
    let page = query(params)?.page.unwrap_or(DEFAULT_PAGE);
    Ok(Json(state.catalog.by_genre(id, page).await?))
}
