pub mod cors;
pub mod request_id;

pub use cors::cors_middleware;
pub use request_id::{REQUEST_ID_HEADER, make_request_span, request_id_middleware};
