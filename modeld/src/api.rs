//! HTTP surface of the anomaly-model service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::model::{ModelError, OutlierModel};

/// Build the service router around a fitted, immutable model.
pub fn router(model: Arc<OutlierModel>) -> Router {
    Router::new()
        .route("/score", post(score))
        .route("/health", get(health))
        .with_state(model)
}

#[derive(Deserialize)]
struct ScoreRequest {
    features: Vec<f64>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn score(
    State(model): State<Arc<OutlierModel>>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<Value>, ApiError> {
    let score = model.infer(&req.features)?;
    Ok(Json(json!({ "score": score })))
}

struct ApiError(ModelError);

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // A malformed feature vector is a contract violation by the caller
        let body = Json(json!({
            "error": self.0.to_string(),
            "status": StatusCode::BAD_REQUEST.as_u16()
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
