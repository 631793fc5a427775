//! HTTP API.
//!
//! Exposes classification and history over axum. Routes are nested under `/api/v1`.
//! Pipeline and database work runs on the blocking pool, never on async workers.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, serve_until};
pub use types::ApiContext;
