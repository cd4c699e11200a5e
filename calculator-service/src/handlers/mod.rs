//! HTTP handlers for the calculator service.

pub mod calculate;
pub mod health;

pub use calculate::{calculate, method_not_allowed};
pub use health::{cors_fallback, health_check};
