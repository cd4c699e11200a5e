//! Domain models for the calculator service.

pub mod calculation;

pub use calculation::{CalculationResponse, MathResult, SingleCalculation};
