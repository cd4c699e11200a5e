//! Application startup and lifecycle management.
//!
//! The composition root: owns the interpreter handle, injects it into the
//! router state and tears it down after the server stops.

use crate::config::{CalculatorConfig, UploadSettings};
use crate::handlers;
use crate::services::InterpreterHandle;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{any, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{cors_middleware, make_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub interpreter: Arc<InterpreterHandle>,
    pub upload: UploadSettings,
}

impl AppState {
    pub fn new(interpreter: Arc<InterpreterHandle>, upload: UploadSettings) -> Self {
        Self {
            interpreter,
            upload,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/calculate",
            post(handlers::calculate).fallback(handlers::method_not_allowed),
        )
        .route("/health", any(handlers::health_check))
        .fallback(handlers::cors_fallback)
        .layer(DefaultBodyLimit::max(state.upload.max_bytes))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(cors_middleware))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the production application.
    ///
    /// The Gemini client is constructed eagerly so a missing credential stops
    /// the process before the listener accepts traffic.
    pub async fn build(config: CalculatorConfig) -> Result<Self, AppError> {
        let interpreter = Arc::new(InterpreterHandle::gemini(config.gemini.clone()));

        interpreter.get().await.map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Failed to create inference client: {}", e))
        })?;

        tracing::info!(
            model = %config.gemini.model,
            timeout_secs = config.gemini.timeout.as_secs(),
            "Initialized Gemini drawing interpreter"
        );

        Self::with_interpreter(config, interpreter).await
    }

    /// Build the application around an existing interpreter handle. The
    /// handle is not resolved until the first `/calculate` request.
    pub async fn with_interpreter(
        config: CalculatorConfig,
        interpreter: Arc<InterpreterHandle>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Calculator service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state: AppState::new(interpreter, config.upload),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM, then close the interpreter.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let interpreter = self.state.interpreter.clone();
        let router = build_router(self.state);

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        interpreter.close();

        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
