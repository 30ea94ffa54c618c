//! Liveness endpoint.

use axum::http::StatusCode;

/// `GET /health`: 200 with "OK" while the server is accepting requests.
///
/// Does not check the worker or any remote service.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
