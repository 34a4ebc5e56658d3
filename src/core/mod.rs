//! Cross-cutting infrastructure
//!
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{ErrorContext, ErrorResponse, GatewayError, Result};
pub use logging::Logger;
