//! Movie catalog proxy
//!
//! Forwards a fixed set of read-only queries to the upstream catalog with a
//! server-held credential.

pub mod client;
pub mod models;

pub use client::TmdbClient;
pub use models::{Genre, Movie, MovieResponse};
