//! The outlier-detection model.
//!
//! An unsupervised detector fitted once at startup against a synthetic
//! reference distribution: per-feature mean/std plus a decision threshold
//! set at the (1 - contamination) quantile of the training distances. The
//! fitted model is immutable, so concurrent inference needs no locking.
//!
//! Sign convention follows the usual decision-function one: larger raw
//! scores mean *less* anomalous. The logistic squash therefore maps
//! inliers below 0.5 and outliers above it.

use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Dimensionality of the feature vectors the model is fitted against.
pub const FEATURE_ARITY: usize = 3;

/// Number of synthetic baseline samples drawn at fit time.
const BASELINE_SAMPLES: usize = 256;

/// Fraction of the baseline treated as outliers when placing the threshold.
const CONTAMINATION: f64 = 0.1;

/// Fixed RNG seed so the fitted baseline is reproducible across restarts.
const BASELINE_SEED: u64 = 42;

/// Steepness of the logistic squash applied to the raw decision score.
const SQUASH_STEEPNESS: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid feature vector: expected {expected} finite values, got {got}")]
    InvalidFeature { expected: usize, got: String },
}

/// A fitted outlier model. Read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierModel {
    means: Vec<f64>,
    stds: Vec<f64>,
    /// Training-distance quantile separating inliers from outliers.
    threshold: f64,
}

impl OutlierModel {
    /// Fit against a synthetic standard-normal baseline with a fixed seed.
    pub fn fit_baseline() -> Self {
        let mut rng = StdRng::seed_from_u64(BASELINE_SEED);
        let normal = Normal::new(0.0, 1.0).expect("unit normal is valid");

        let samples: Vec<Vec<f64>> = (0..BASELINE_SAMPLES)
            .map(|_| (0..FEATURE_ARITY).map(|_| normal.sample(&mut rng)).collect())
            .collect();

        let mut means = vec![0.0; FEATURE_ARITY];
        for sample in &samples {
            for (j, v) in sample.iter().enumerate() {
                means[j] += v;
            }
        }
        for m in &mut means {
            *m /= BASELINE_SAMPLES as f64;
        }

        let mut stds = vec![0.0; FEATURE_ARITY];
        for sample in &samples {
            for (j, v) in sample.iter().enumerate() {
                let d = v - means[j];
                stds[j] += d * d;
            }
        }
        for s in &mut stds {
            *s = (*s / BASELINE_SAMPLES as f64).sqrt().max(1e-9);
        }

        let mut model = Self { means, stds, threshold: 0.0 };

        // Threshold at the (1 - contamination) quantile of training distances
        let mut distances: Vec<f64> = samples.iter().map(|s| model.distance(s)).collect();
        distances.sort_by(|a, b| a.total_cmp(b));
        let idx = ((1.0 - CONTAMINATION) * (BASELINE_SAMPLES as f64 - 1.0)).round() as usize;
        model.threshold = distances[idx];

        model
    }

    /// Normalized distance of a vector from the fitted baseline.
    fn distance(&self, features: &[f64]) -> f64 {
        let sum_sq: f64 = features
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(x, (m, s))| {
                let z = (x - m) / s;
                z * z
            })
            .sum();
        (sum_sq / self.means.len() as f64).sqrt()
    }

    /// Raw decision score: positive for inliers, negative for outliers.
    fn decision(&self, features: &[f64]) -> f64 {
        self.threshold - self.distance(features)
    }

    pub fn arity(&self) -> usize {
        self.means.len()
    }

    /// Score a feature vector, mapped into (0, 1) via a logistic squash.
    pub fn infer(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.arity() || features.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidFeature {
                expected: self.arity(),
                got: format!("{:?}", features),
            });
        }

        let raw = self.decision(features);
        Ok(1.0 / (1.0 + (SQUASH_STEEPNESS * raw).exp()))
    }

    /// Load a persisted model artifact.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact: {}", path.display()))?;
        let model: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse model artifact: {}", path.display()))?;
        Ok(model)
    }

    /// Persist the fitted model for reuse across restarts.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write model artifact: {}", path.display()))?;
        Ok(())
    }

    /// Load the artifact at `path`, or fit a fresh baseline and persist it.
    /// A corrupt artifact is refitted rather than treated as fatal.
    pub fn load_or_fit(path: &Path) -> Result<Self> {
        if path.exists() {
            match Self::load(path) {
                Ok(model) => {
                    info!(path = %path.display(), "loaded model artifact");
                    return Ok(model);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "model artifact unusable, refitting");
                }
            }
        }

        let model = Self::fit_baseline();
        model.save(path)?;
        info!(path = %path.display(), "fitted baseline model and persisted artifact");
        Ok(model)
    }
}
