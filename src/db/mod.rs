//! Database module
//!
//! - Connection pool management
//! - Schema migrations
//! - User records and the credential store

pub mod manager;
pub mod migrations;
pub mod models;
pub mod repository;

pub use manager::DatabaseManager;
pub use models::{NewUser, User};
pub use repository::{CredentialStore, UserRepository};
