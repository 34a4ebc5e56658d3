//! Registration and login orchestration
//!
//! Combines the credential store, the password hasher and the token issuer.
//! bcrypt work is CPU bound and runs on the blocking pool.

use crate::auth::jwt::TokenService;
use crate::auth::password::PasswordHasher;
use crate::core::error::{GatewayError, Result};
use crate::db::{CredentialStore, NewUser, User};
use std::sync::Arc;
use tracing::{info, warn};

/// A user together with a freshly issued token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create an account and sign the new user in
    ///
    /// The lookup only avoids hashing for an obvious duplicate; the store's
    /// unique constraint decides races.
    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<AuthSession> {
        require_non_empty("email", email)?;
        require_non_empty("username", username)?;
        require_non_empty("password", password)?;
        if !email.contains('@') {
            return Err(GatewayError::ValidationError(
                "email must contain '@'".to_string(),
            ));
        }

        if self.store.find_by_email(email).await?.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(GatewayError::DuplicateEmail);
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .store
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        let token = self.tokens.issue(user.id)?;
        info!(user_id = user.id, "User registered");

        Ok(AuthSession { user, token })
    }

    /// Check credentials and issue a token
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        require_non_empty("email", email)?;
        require_non_empty("password", password)?;

        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!("Login failed");
                return Err(GatewayError::InvalidCredentials);
            }
        };

        if !self.verify(password, &user.password_hash).await? {
            warn!(user_id = user.id, "Login failed");
            return Err(GatewayError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = user.id, "User logged in");

        Ok(AuthSession { user, token })
    }

    async fn hash(&self, password: &str) -> Result<String> {
        let hasher = self.hasher;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| GatewayError::TaskError(e.to_string()))?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let hasher = self.hasher;
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| GatewayError::TaskError(e.to_string()))?
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::ValidationError(format!(
            "{} is required",
            field
        )));
    }
    Ok(())
}
