//! HTTP client for the anomaly-model service (`modeld`).
//!
//! The call is the sole suspension point in the drift-scoring path. Every
//! failure mode is folded into [`UpstreamError`] so the orchestrator can
//! pattern-match and fall through to its heuristic; nothing here retries.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::FeatureVector;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("model service unreachable: {0}")]
    Unreachable(String),
    #[error("model service returned status {0}")]
    BadStatus(u16),
    #[error("model service response was not decodable: {0}")]
    BadResponse(String),
}

#[derive(Serialize)]
struct ScoreRequest {
    features: Vec<f64>,
}

#[derive(Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// Client for `POST /score` on the anomaly-model service.
pub struct ModelClient {
    client: Client,
    base_url: String,
}

impl ModelClient {
    /// Build a client with a hard per-call timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the model service to score a feature vector.
    ///
    /// Timeouts, connection failures, non-success statuses, and undecodable
    /// bodies all surface as [`UpstreamError`]; the caller decides the
    /// fallback.
    pub async fn score(&self, features: &FeatureVector) -> Result<f64, UpstreamError> {
        let url = format!("{}/score", self.base_url);
        let body = ScoreRequest { features: features.to_vec() };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::BadStatus(status.as_u16()));
        }

        let decoded: ScoreResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::BadResponse(e.to_string()))?;

        Ok(decoded.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_is_an_upstream_error() {
        // Port 1 is reserved and nothing listens there
        let client = ModelClient::new("http://127.0.0.1:1", 1).unwrap();
        let features = FeatureVector { changes: 1, manifest_len: 10, image_refs: 0 };

        let err = client.score(&features).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unreachable(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = ModelClient::new("http://localhost:8001/", 5).unwrap();
        assert_eq!(client.base_url, "http://localhost:8001");
    }
}
