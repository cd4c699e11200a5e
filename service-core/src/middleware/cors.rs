use axum::{
    extract::Request,
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS, PUT, DELETE";
pub const ALLOW_HEADERS: &str = "Accept, Content-Type, Content-Length, Authorization";

/// Permissive CORS for browser-based drawing clients.
///
/// Every response gets the allow-origin/methods/headers triple, including
/// error responses. `OPTIONS` never reaches the router: it is answered here
/// with 200 and an empty body.
pub async fn cors_middleware(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static(ALLOW_HEADERS),
    );
}
