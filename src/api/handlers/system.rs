//! System handlers

use super::AppState;
use crate::core::error::Result;
use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub components: ComponentsHealth,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentsHealth {
    pub database: ComponentHealth,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler for GET /health
///
/// Always answers 200; an unreachable database shows up in the body.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let database = check_database_health(&state).await;

    let status = if database.status == HealthStatus::Healthy {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    Ok(Json(HealthResponse {
        status,
        version: crate::VERSION,
        components: ComponentsHealth { database },
        timestamp: Utc::now().to_rfc3339(),
    }))
}

async fn check_database_health(state: &AppState) -> ComponentHealth {
    let result = state
        .db
        .execute(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
        .await;

    match result {
        Ok(_) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some("Database unavailable".to_string()),
            }
        }
    }
}
