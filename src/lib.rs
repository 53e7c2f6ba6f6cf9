//! DriftGuard -- drift and secret-leak risk scoring for deployment manifests.
//!
//! This crate provides the core library for manifest feature extraction,
//! secret-leak heuristics, anomaly-score orchestration, and the append-only
//! event store behind the scoring API.

pub mod api;
pub mod config;
pub mod manifest;
pub mod metrics;
pub mod model;
pub mod score;
pub mod secrets;
pub mod storage;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::model::ModelClient;
use crate::score::ScoringEngine;

/// Start the DriftGuard daemon: event store, scoring engine, and API server.
pub async fn serve(bind: &str, config: Config) -> Result<()> {
    // 1. Initialize storage
    tracing::info!(db_path = %config.db_path, "Initializing event store");
    let pool = storage::open_pool(&config.db_path)?;

    // 2. Scoring engine (model client + metrics), shared read-only across handlers
    let metrics = Arc::new(Metrics::new());
    let client = ModelClient::new(&config.model_url, config.model_timeout_secs)?;
    let engine = Arc::new(ScoringEngine::new(pool.clone(), client, metrics.clone()));

    // 3. API server
    let addr: std::net::SocketAddr = bind.parse()?;
    let state = api::state::AppState {
        pool,
        engine,
        metrics,
        api_token: Arc::new(config.api_token),
    };
    let app = api::router(state);

    tracing::info!(%addr, "DriftGuard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
