use calculator_service::config::CalculatorConfig;
use calculator_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty());
    init_tracing("calculator-service", "info", otlp_endpoint.as_deref());

    let config = CalculatorConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start calculator service: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let result = app.run_until_stopped().await;
    shutdown_tracing();
    result
}
