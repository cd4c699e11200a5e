//! Once-only construction of the shared drawing interpreter.
//!
//! The handle is created by the composition root and lives in the router
//! state. The factory runs at most once per handle: concurrent first callers
//! wait for that single attempt and all observe its outcome, success or
//! failure. There is no re-initialisation path.

use super::providers::gemini::GeminiClient;
use super::providers::{DrawingInterpreter, InferenceError};
use crate::config::GeminiSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

type Factory =
    Box<dyn Fn() -> Result<Arc<dyn DrawingInterpreter>, InferenceError> + Send + Sync>;

/// Outcome of [`InterpreterHandle::get`]. The error is shared by every caller.
pub type InterpreterResult = Result<Arc<dyn DrawingInterpreter>, Arc<InferenceError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

pub struct InterpreterHandle {
    factory: Factory,
    cell: OnceCell<InterpreterResult>,
    initializing: AtomicBool,
}

impl InterpreterHandle {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn DrawingInterpreter>, InferenceError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cell: OnceCell::new(),
            initializing: AtomicBool::new(false),
        }
    }

    /// Handle that builds a [`GeminiClient`] from `settings` on first use.
    pub fn gemini(settings: GeminiSettings) -> Self {
        Self::new(move || {
            let client = GeminiClient::new(settings.clone())?;
            Ok(Arc::new(client) as Arc<dyn DrawingInterpreter>)
        })
    }

    /// Resolve the interpreter, constructing it on the first call.
    pub async fn get(&self) -> InterpreterResult {
        self.cell
            .get_or_init(|| async {
                self.initializing.store(true, Ordering::SeqCst);
                let outcome = (self.factory)();
                match &outcome {
                    Ok(_) => tracing::info!("Inference client initialized"),
                    Err(e) => tracing::error!(error = %e, "Failed to initialize inference client"),
                }
                self.initializing.store(false, Ordering::SeqCst);
                outcome.map_err(Arc::new)
            })
            .await
            .clone()
    }

    pub fn state(&self) -> HandleState {
        match self.cell.get() {
            Some(Ok(_)) => HandleState::Ready,
            Some(Err(_)) => HandleState::Failed,
            None if self.initializing.load(Ordering::SeqCst) => HandleState::Initializing,
            None => HandleState::Uninitialized,
        }
    }

    /// Close the interpreter if it was ever built. No-op otherwise.
    pub fn close(&self) {
        if let Some(Ok(interpreter)) = self.cell.get() {
            interpreter.close();
        }
    }
}
