use axum::http::StatusCode;

/// Liveness probe. Never touches the inference client.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Catch-all for unrouted paths. CORS headers come from the middleware.
pub async fn cors_fallback() -> StatusCode {
    StatusCode::OK
}
