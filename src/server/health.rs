//! Liveness endpoint.
//!
//! Answers 200 as long as the listener is accepting connections. It says
//! nothing about whether a consumer is draining the delivery channel.

use axum::http::StatusCode;

/// Health check handler.
///
/// # Example
///
/// ```ignore
/// GET /health HTTP/1.1
///
/// HTTP/1.1 200 OK
///
/// OK
/// ```
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
