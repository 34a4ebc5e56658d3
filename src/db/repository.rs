//! Repository pattern implementation for data access layer
//!
//! `CredentialStore` is the seam the authentication flow depends on;
//! `UserRepository` is its SQLite implementation.

use crate::core::error::{GatewayError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{NewUser, User};
use async_trait::async_trait;
use rusqlite::{ffi, OptionalExtension, Row};
use std::sync::Arc;

/// Storage of user credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by exact (case-sensitive) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Persist a new user and return it with its assigned ID
    ///
    /// Fails with `GatewayError::DuplicateEmail` when the email is taken,
    /// including when a concurrent registration got there first.
    async fn create(&self, user: NewUser) -> Result<User>;
}

/// Repository for User entities
pub struct UserRepository {
    db: Arc<DatabaseManager>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .await
    }
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                        [&email],
                        map_user,
                    )
                    .optional()?)
            })
            .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                        [id],
                        map_user,
                    )
                    .optional()?)
            })
            .await
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let created_at = chrono::Utc::now().to_rfc3339();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO users (username, email, password_hash, created_at) \
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![&user.username, &user.email, &user.password_hash, &created_at],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        GatewayError::DuplicateEmail
                    } else {
                        GatewayError::DatabaseError(e)
                    }
                })?;

                Ok(User {
                    id: conn.last_insert_rowid(),
                    username: user.username,
                    email: user.email,
                    password_hash: user.password_hash,
                    created_at,
                })
            })
            .await
    }
}
