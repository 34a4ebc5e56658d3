//! Error type system for the gateway
//!
//! This module provides:
//! - A single error enum shared by every layer below the HTTP boundary
//! - HTTP status code mapping
//! - Uniform, non-revealing bodies for authentication failures
//! - Error responses carrying a trace ID

use crate::api::middleware::trace::current_trace_id;
use crate::auth::jwt::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Message returned for every 401, whatever the internal cause.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Main error type for the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // System-level errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Background task failed: {0}")]
    TaskError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Authentication errors
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or malformed Authorization header")]
    MissingCredentials,

    #[error("Token rejected: {0}")]
    Token(#[from] TokenError),

    // Upstream catalog errors
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) | GatewayError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }

            GatewayError::InvalidCredentials
            | GatewayError::MissingCredentials
            | GatewayError::Token(_) => StatusCode::UNAUTHORIZED,

            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,

            GatewayError::DuplicateEmail => StatusCode::CONFLICT,

            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,

            GatewayError::ConfigError(_)
            | GatewayError::DatabaseError(_)
            | GatewayError::PoolError(_)
            | GatewayError::HashingError(_)
            | GatewayError::TaskError(_)
            | GatewayError::IoError(_)
            | GatewayError::NetworkError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    ///
    /// All authentication failures share one name so clients cannot tell a
    /// forged token from an expired one.
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::ConfigError(_) => "ConfigError",
            GatewayError::DatabaseError(_) | GatewayError::PoolError(_) => "DatabaseError",
            GatewayError::HashingError(_) => "HashingError",
            GatewayError::TaskError(_) => "TaskError",
            GatewayError::IoError(_) => "IoError",
            GatewayError::InvalidRequest(_) => "InvalidRequest",
            GatewayError::ValidationError(_) => "ValidationError",
            GatewayError::NotFound(_) => "NotFound",
            GatewayError::DuplicateEmail => "DuplicateEmail",
            GatewayError::InvalidCredentials
            | GatewayError::MissingCredentials
            | GatewayError::Token(_) => "AuthenticationError",
            GatewayError::NetworkError(_) => "NetworkError",
            GatewayError::Upstream(_) => "UpstreamError",
        }
    }

    /// Message that is safe to hand to the client
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => UNAUTHORIZED_MESSAGE.to_string(),
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::BAD_GATEWAY => "Upstream catalog request failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Trace ID of the failed request, as sent in `X-Trace-Id`
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create an error response carrying a specific trace ID
    pub fn with_trace_id(error: String, message: String, trace_id: String) -> Self {
        Self {
            error,
            message,
            trace_id,
        }
    }

    /// Create an error response from a GatewayError
    ///
    /// Inside a traced request the body reuses that request's trace ID;
    /// elsewhere a fresh one is generated.
    pub fn from_error(error: &GatewayError) -> Self {
        let trace_id = current_trace_id().unwrap_or_else(Uuid::new_v4);
        Self::from_error_with_trace_id(error, trace_id.to_string())
    }

    /// Create an error response from a GatewayError with a specific trace ID
    pub fn from_error_with_trace_id(error: &GatewayError, trace_id: String) -> Self {
        Self::with_trace_id(error.error_type().to_string(), error.public_message(), trace_id)
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (trace_id: {})",
            self.error, self.message, self.trace_id
        )
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        // The full cause only goes to the log, never into the body
        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Context extension trait for turning foreign errors into startup failures
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| GatewayError::ConfigError(format!("{}: {}", context.into(), e)))
    }
}
