//! Bearer-token authentication middleware.
//!
//! Single shared token compared by exact string match; no per-user
//! identity, rotation, or scopes. A missing or malformed header is
//! unauthorized (401); a present-but-wrong token is forbidden (403).

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::state::AppState;

pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

    if token != state.api_token.as_str() {
        tracing::warn!("rejected request with invalid API token");
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
