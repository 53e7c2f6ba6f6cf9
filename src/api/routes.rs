//! API route definitions and handlers.

use axum::extract::State;
use axum::http::header;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::auth::require_bearer;
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::score::DriftOutcome;
use crate::storage;

/// Maximum number of rows returned by `GET /events`.
const EVENTS_LIMIT: usize = 200;

pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/drift/check", post(check_drift))
        .route("/secret/check", post(check_secret))
        .route("/events", get(list_events))
        .route_layer(middleware::from_fn_with_state(state, require_bearer));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

#[derive(Deserialize)]
struct DriftRequest {
    manifest: String,
    #[serde(default = "default_source")]
    source: String,
}

fn default_source() -> String {
    "uploaded".to_string()
}

#[derive(Deserialize)]
struct SecretRequest {
    diff: String,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.prometheus(),
    )
}

async fn check_drift(
    State(state): State<AppState>,
    Json(req): Json<DriftRequest>,
) -> Result<Json<DriftOutcome>, ApiError> {
    let outcome = state.engine.score_drift(&req.manifest, &req.source).await?;
    Ok(Json(outcome))
}

async fn check_secret(
    State(state): State<AppState>,
    Json(req): Json<SecretRequest>,
) -> Result<Json<Value>, ApiError> {
    let score = state.engine.score_secret(&req.diff).await?;
    Ok(Json(json!({ "score": score })))
}

async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<storage::EventRow>>, ApiError> {
    let pool = state.pool.clone();
    let events = tokio::task::spawn_blocking(move || storage::recent_events(&pool, EVENTS_LIMIT))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(events))
}
