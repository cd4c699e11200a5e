use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced to HTTP callers.
///
/// Every variant renders as a `text/plain` body carrying the human-readable
/// message, so browser clients can show it as-is.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0:#}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0:#}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }

        // String bodies are served as text/plain; charset=utf-8
        (status, self.to_string()).into_response()
    }
}
