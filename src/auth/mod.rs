//! Authentication module
//!
//! - Password hashing and verification
//! - Session token issuance and validation
//! - The request gate and its axum middleware
//! - Registration and login

pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use handlers::{get_me, login, register};
pub use jwt::{Claims, TokenError, TokenService};
pub use middleware::{authenticate, AuthGate, AuthUser};
pub use password::PasswordHasher;
pub use service::{AuthService, AuthSession};
