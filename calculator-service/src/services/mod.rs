pub mod interpreter_handle;
pub mod providers;
pub mod reply_parser;

pub use interpreter_handle::{HandleState, InterpreterHandle};
pub use providers::{DrawingInterpreter, InferenceError};
