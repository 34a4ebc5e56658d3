//! cinegate
//!
//! An authenticating gateway in front of a movie catalog: users register and
//! log in against a local credential store, receive signed bearer tokens,
//! and use them to reach catalog queries proxied with a server-held key.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod core;
pub mod db;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::Config;
pub use db::DatabaseManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
