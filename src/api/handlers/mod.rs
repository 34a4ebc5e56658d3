pub mod movies;
pub mod system;

pub use movies::*;
pub use system::*;

use crate::auth::{AuthGate, AuthService};
use crate::catalog::TmdbClient;
use crate::db::DatabaseManager;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub gate: AuthGate,
    pub catalog: Arc<TmdbClient>,
    pub db: Arc<DatabaseManager>,
}
