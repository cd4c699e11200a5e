//! Drawing interpreter abstractions and implementations.
//!
//! The HTTP layer only sees the [`DrawingInterpreter`] trait, so the Gemini
//! backend can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;
pub mod prompt;

use crate::models::MathResult;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error type for interpreter operations.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("{0}")]
    Configuration(String),

    #[error("error generating content: {0}")]
    Transport(String),

    #[error("error generating content: request timed out after {0:?}")]
    Timeout(Duration),

    #[error("error generating content: Gemini API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no response from model")]
    NoResponse,

    #[error("error parsing response as JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("inference client is closed")]
    Closed,
}

/// Turns an image of handwritten math into expression/result pairs.
#[async_trait]
pub trait DrawingInterpreter: Send + Sync {
    /// Interpret a PNG drawing.
    ///
    /// The returned sequence may be empty; the caller decides how to shape it.
    async fn process_drawing(&self, image: &[u8]) -> Result<Vec<MathResult>, InferenceError>;

    /// Release network resources. Calling it more than once is harmless.
    fn close(&self) {}
}
