//! service-core: Shared infrastructure for the calculator services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use tokio;
pub use tracing;
