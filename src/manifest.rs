//! Manifest feature extraction.
//!
//! Turns a multi-document YAML manifest submission into the fixed-arity
//! numeric feature vector consumed by the anomaly model. The traversal is
//! deliberately lenient: non-mapping documents are skipped and missing keys
//! count as zero matches. The only hard failure is a YAML parse error.

use serde::de::Deserialize as _;
use serde::Serialize;
use serde_yaml::Value;
use thiserror::Error;

/// Replica counts treated as suspicious sentinels (accidental scale-to-zero
/// or runaway scale-up). Tunable constants.
const SUSPICIOUS_REPLICAS: [i64; 2] = [0, 100];

/// Image tag markers considered mutable/untrusted. Tunable constants.
const UNTRUSTED_TAG_MARKERS: [&str; 2] = [":latest", ":dev"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Fixed-arity feature summary of one manifest submission.
///
/// Positional meaning is stable across all callers: the anomaly model is
/// fitted against vectors with exactly this layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Count of risk-triggering structural changes across all documents.
    pub changes: u32,
    /// Total length of the raw submission in bytes.
    pub manifest_len: usize,
    /// Occurrences of the `image:` key in the raw text.
    pub image_refs: usize,
}

/// Number of features in the vector. Must match the model's fitted arity.
pub const FEATURE_ARITY: usize = 3;

impl FeatureVector {
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.changes as f64,
            self.manifest_len as f64,
            self.image_refs as f64,
        ]
    }
}

/// Extract the feature vector from a raw manifest submission.
///
/// Parses `raw` as a multi-document YAML stream; a parse failure in any
/// document is an [`ExtractError::InvalidManifest`] carrying the parser's
/// message. Once parsed, feature computation cannot fail: an empty stream
/// yields the all-zero vector.
pub fn extract(raw: &str) -> Result<FeatureVector, ExtractError> {
    let mut changes = 0u32;

    for document in serde_yaml::Deserializer::from_str(raw) {
        let doc = Value::deserialize(document)
            .map_err(|e| ExtractError::InvalidManifest(e.to_string()))?;
        changes += count_document_changes(&doc);
    }

    Ok(FeatureVector {
        changes,
        manifest_len: raw.len(),
        image_refs: raw.matches("image:").count(),
    })
}

/// Count suspicious structural changes in one parsed document.
/// Non-mapping documents contribute nothing.
fn count_document_changes(doc: &Value) -> u32 {
    if !doc.is_mapping() {
        return 0;
    }

    let mut changes = 0;
    let spec = &doc["spec"];

    if let Some(replicas) = spec["replicas"].as_i64() {
        if SUSPICIOUS_REPLICAS.contains(&replicas) {
            changes += 1;
        }
    }

    if let Some(containers) = spec["template"]["spec"]["containers"].as_sequence() {
        for container in containers {
            if let Some(image) = container["image"].as_str() {
                if UNTRUSTED_TAG_MARKERS.iter().any(|m| image.contains(m)) {
                    changes += 1;
                }
            }
        }
    }

    changes
}
