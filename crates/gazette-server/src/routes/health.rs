//! Liveness endpoint.

use axum::http::StatusCode;

/// `GET /health` — plain liveness probe.
pub async fn health() -> StatusCode {
    StatusCode::OK
}
