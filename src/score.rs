//! Scoring orchestrator -- composes extraction, the anomaly-model call, and
//! the heuristic fallback into one score per request, then persists the
//! event.
//!
//! Known inconsistency: the fallback heuristic (`changes / 5`) and the
//! model-based score are not on a calibrated comparable scale. Both land in
//! [0, 1] and that is the only property callers may rely on.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::manifest::{self, ExtractError, FeatureVector};
use crate::metrics::Metrics;
use crate::model::ModelClient;
use crate::secrets;
use crate::storage::{self, EventKind, Pool};

/// Divisor for the heuristic fallback score: `min(1, changes / 5)`.
const FALLBACK_CHANGE_DIVISOR: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// Malformed manifest; surfaced to the caller with the parse detail.
    #[error(transparent)]
    InvalidInput(#[from] ExtractError),

    /// Event persistence failed; fatal to the request.
    #[error("failed to persist event: {0}")]
    Storage(#[source] anyhow::Error),
}

/// A risk score, always clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Result of one drift-scoring request.
#[derive(Debug, Serialize)]
pub struct DriftOutcome {
    pub score: RiskScore,
    /// Raw structural-change count, exposed as diagnostic context.
    pub changes: u32,
}

#[derive(Serialize)]
struct DriftDetails<'a> {
    features: Vec<f64>,
    source: &'a str,
}

/// Composes the scoring pipeline. Shared read-only across request handlers.
pub struct ScoringEngine {
    pool: Pool,
    client: ModelClient,
    metrics: Arc<Metrics>,
}

impl ScoringEngine {
    pub fn new(pool: Pool, client: ModelClient, metrics: Arc<Metrics>) -> Self {
        Self { pool, client, metrics }
    }

    /// Score a manifest submission for configuration drift.
    ///
    /// Extraction failures propagate unchanged and persist nothing. Any
    /// model-call failure falls through to the heuristic, which is total;
    /// the request always completes with a score unless persistence fails.
    pub async fn score_drift(
        &self,
        manifest_text: &str,
        source: &str,
    ) -> Result<DriftOutcome, ScoreError> {
        let features = manifest::extract(manifest_text)?;
        let changes = features.changes;

        let score = match self.client.score(&features).await {
            Ok(raw) => {
                debug!(raw, changes, "model scored drift submission");
                RiskScore::clamped(raw)
            }
            Err(err) => {
                warn!(%err, changes, "model unavailable, using heuristic fallback");
                fallback_score(&features)
            }
        };

        self.metrics.set_drift_score(score.value());
        self.metrics.record_event(EventKind::Drift);

        let details = serde_json::to_string(&DriftDetails {
            features: features.to_vec(),
            source,
        })
        .map_err(|e| ScoreError::Storage(e.into()))?;
        self.persist(EventKind::Drift, details, score).await?;

        Ok(DriftOutcome { score, changes })
    }

    /// Score diff text for secret leaks. No remote call, no fallback needed.
    pub async fn score_secret(&self, diff_text: &str) -> Result<RiskScore, ScoreError> {
        let score = RiskScore::clamped(secrets::score_leak(diff_text));

        self.metrics.record_event(EventKind::Secret);
        self.persist(EventKind::Secret, diff_text.to_string(), score).await?;

        Ok(score)
    }

    async fn persist(
        &self,
        kind: EventKind,
        details: String,
        score: RiskScore,
    ) -> Result<(), ScoreError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            storage::append_event(&pool, kind, &details, score.value())
        })
        .await
        .map_err(|e| ScoreError::Storage(e.into()))?
        .map_err(ScoreError::Storage)?;
        Ok(())
    }
}

/// Pure heuristic used when the model is unreachable. Total: always yields
/// a value in [0, 1].
fn fallback_score(features: &FeatureVector) -> RiskScore {
    RiskScore::clamped(features.changes as f64 / FALLBACK_CHANGE_DIVISOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_memory_pool;

    fn engine_with_unreachable_model() -> ScoringEngine {
        let pool = open_memory_pool().unwrap();
        // Nothing listens on port 1, so every model call errors
        let client = ModelClient::new("http://127.0.0.1:1", 1).unwrap();
        ScoringEngine::new(pool, client, Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_drift_falls_back_when_model_unreachable() {
        let engine = engine_with_unreachable_model();
        let manifest = "\
spec:
  replicas: 0
  template:
    spec:
      containers:
        - image: web:latest
";
        let outcome = engine.score_drift(manifest, "uploaded").await.unwrap();
        assert_eq!(outcome.changes, 2);
        assert_eq!(outcome.score.value(), 2.0 / 5.0);
    }

    #[tokio::test]
    async fn test_each_call_appends_exactly_one_event() {
        let engine = engine_with_unreachable_model();

        let outcome = engine.score_drift("spec:\n  replicas: 3\n", "uploaded").await.unwrap();
        let events = storage::recent_events(&engine.pool, 200).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "drift");
        assert_eq!(events[0].score, outcome.score.value());

        let score = engine.score_secret("api_key=ABCD1234EFGH5678TOKEN12345").await.unwrap();
        let events = storage::recent_events(&engine.pool, 200).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "secret");
        assert_eq!(events[0].score, score.value());
    }

    #[tokio::test]
    async fn test_invalid_manifest_persists_nothing() {
        let engine = engine_with_unreachable_model();

        let err = engine.score_drift("not: [valid yaml: :", "uploaded").await.unwrap_err();
        assert!(matches!(err, ScoreError::InvalidInput(_)));
        assert_eq!(storage::count_events(&engine.pool).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fallback_saturates_at_one() {
        let engine = engine_with_unreachable_model();
        // Six :latest containers -> changes = 6 -> heuristic saturates
        let mut manifest = String::from("spec:\n  template:\n    spec:\n      containers:\n");
        for i in 0..6 {
            manifest.push_str(&format!("        - image: app{}:latest\n", i));
        }
        let outcome = engine.score_drift(&manifest, "uploaded").await.unwrap();
        assert_eq!(outcome.changes, 6);
        assert_eq!(outcome.score.value(), 1.0);
    }

    #[tokio::test]
    async fn test_drift_updates_metrics_gauge() {
        let engine = engine_with_unreachable_model();
        engine.score_drift("spec:\n  replicas: 0\n", "uploaded").await.unwrap();
        assert_eq!(engine.metrics.latest_drift_score(), 1.0 / 5.0);
    }

    #[test]
    fn test_risk_score_is_clamped() {
        assert_eq!(RiskScore::clamped(1.7).value(), 1.0);
        assert_eq!(RiskScore::clamped(-0.2).value(), 0.0);
        assert_eq!(RiskScore::clamped(0.5).value(), 0.5);
    }
}
