//! REST API module
//!
//! - Server assembly and graceful shutdown
//! - Public and token-gated routes
//! - Request tracing middleware

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
pub use server::ApiServer;
