//! Authentication middleware
//!
//! `AuthGate` holds the decision logic and only sees the raw `Authorization`
//! header value, so it can be tested without an HTTP stack. `authenticate`
//! adapts it to axum.

use crate::auth::jwt::TokenService;
use crate::core::error::{GatewayError, Result};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

const BEARER_SCHEME: &str = "Bearer";

/// Identity attached to a request once its token has been verified
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
}

/// Stateless request gate backed by a token verifier
#[derive(Clone, Debug)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// Decide whether a request carrying `authorization` may pass
    ///
    /// A missing header, another scheme or an empty token is
    /// `MissingCredentials`; every verifier failure is `Token(_)`.
    pub fn admit(&self, authorization: Option<&str>) -> Result<AuthUser> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(GatewayError::MissingCredentials)?;

        let claims = self.tokens.verify(token)?;
        Ok(AuthUser { id: claims.user_id })
    }
}

/// Pull the token out of a `Bearer <token>` header value
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match gate.admit(authorization) {
        Ok(user) => {
            tracing::debug!(user_id = user.id, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), reason = %e, "Request rejected");
            e.into_response()
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(GatewayError::MissingCredentials)
    }
}
