//! API error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::score::ScoreError;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed Authorization header.
    Unauthorized,
    /// Token present but does not match.
    Forbidden,
    /// Client-side input failure, message is echoed to the caller.
    Validation(String),
    /// Anything the caller cannot fix.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing token".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "invalid token".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::InvalidInput(e) => ApiError::Validation(e.to_string()),
            ScoreError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}
