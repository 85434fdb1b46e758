//! API error types for the gazette server.
//!
//! Maps core domain errors to HTTP status codes and JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type for route handlers.
pub enum ApiError {
    /// Internal storage/database error.
    Storage(gazette_core::error::StorageError),
    /// Bad request (malformed day key, etc.).
    BadRequest(String),
}

impl From<gazette_core::error::StorageError> for ApiError {
    fn from(err: gazette_core::error::StorageError) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Storage(e) => {
                tracing::error!("storage error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
