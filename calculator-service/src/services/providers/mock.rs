//! Mock interpreter for testing.

use super::{DrawingInterpreter, InferenceError};
use crate::models::MathResult;
use crate::services::reply_parser::parse_results;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Replays a canned model reply through the real reply parser.
pub struct MockInterpreter {
    reply: Result<String, String>,
    calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockInterpreter {
    /// Answer every drawing with `reply` as if the model had produced it.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Fail every drawing with a transport error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DrawingInterpreter for MockInterpreter {
    async fn process_drawing(&self, _image: &[u8]) -> Result<Vec<MathResult>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.is_closed() {
            return Err(InferenceError::Closed);
        }

        match &self.reply {
            Ok(text) => Ok(parse_results(text)?),
            Err(message) => Err(InferenceError::Transport(message.clone())),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
