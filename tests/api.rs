//! Router-level API tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use driftguard::api::{self, state::AppState};
use driftguard::metrics::Metrics;
use driftguard::model::ModelClient;
use driftguard::score::ScoringEngine;
use driftguard::storage;

const TOKEN: &str = "test-token";

/// App wired to an in-memory event store and an unreachable model service,
/// so drift checks exercise the heuristic fallback.
fn test_app() -> axum::Router {
    let pool = storage::open_memory_pool().unwrap();
    let metrics = Arc::new(Metrics::new());
    let client = ModelClient::new("http://127.0.0.1:1", 1).unwrap();
    let engine = Arc::new(ScoringEngine::new(pool.clone(), client, metrics.clone()));

    api::router(AppState {
        pool,
        engine,
        metrics,
        api_token: Arc::new(TOKEN.to_string()),
    })
}

fn post_json(uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = test_app()
        .oneshot(post_json("/drift/check", None, r#"{"manifest": ""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_token_is_forbidden() {
    let response = test_app()
        .oneshot(post_json("/drift/check", Some("nope"), r#"{"manifest": ""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_drift_check_scores_and_reports_changes() {
    let body = serde_json::json!({
        "manifest": "spec:\n  replicas: 0\n  template:\n    spec:\n      containers:\n        - image: web:latest\n"
    });

    let response = test_app()
        .oneshot(post_json("/drift/check", Some(TOKEN), &body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["changes"], 2);
    let score = json["score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    // Model is unreachable, so the heuristic fallback applies
    assert_eq!(score, 2.0 / 5.0);
}

#[tokio::test]
async fn test_invalid_yaml_is_a_validation_error() {
    let body = serde_json::json!({ "manifest": "not: [valid yaml: :" });

    let response = test_app()
        .oneshot(post_json("/drift/check", Some(TOKEN), &body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("invalid manifest"));
}

#[tokio::test]
async fn test_secret_check_and_event_listing() {
    let app = test_app();

    let body = serde_json::json!({ "diff": "+ api_key=ABCD1234EFGH5678TOKEN12345" });
    let response = app
        .clone()
        .oneshot(post_json("/secret/check", Some(TOKEN), &body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let score = json["score"].as_f64().unwrap();
    assert!(score > 0.0);

    let request = Request::get("/events")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = body_json(response).await;
    let rows = events.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["kind"], "secret");
    assert_eq!(rows[0]["score"].as_f64().unwrap(), score);
}

#[tokio::test]
async fn test_health_and_metrics_need_no_auth() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("driftguard_events_total"));
    assert!(text.contains("driftguard_latest_drift_score"));
}
