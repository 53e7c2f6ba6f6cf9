//! Process metrics: event counters by kind and the latest drift score.
//!
//! Counters are plain atomics touched by concurrent request handlers; the
//! gauge stores `f64` bits in an `AtomicU64`. Exported in Prometheus text
//! format on `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::storage::EventKind;

/// Metrics shared across request handlers via `Arc`.
pub struct Metrics {
    drift_events: AtomicU64,
    secret_events: AtomicU64,
    latest_drift_score: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            drift_events: AtomicU64::new(0),
            secret_events: AtomicU64::new(0),
            latest_drift_score: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    /// Record one scored event of the given kind.
    pub fn record_event(&self, kind: EventKind) {
        match kind {
            EventKind::Drift => self.drift_events.fetch_add(1, Ordering::Relaxed),
            EventKind::Secret => self.secret_events.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Update the latest-drift-score gauge.
    pub fn set_drift_score(&self, score: f64) {
        self.latest_drift_score.store(score.to_bits(), Ordering::Relaxed);
    }

    pub fn latest_drift_score(&self) -> f64 {
        f64::from_bits(self.latest_drift_score.load(Ordering::Relaxed))
    }

    /// Export metrics in Prometheus text format.
    pub fn prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP driftguard_events_total Total scored events by kind\n");
        output.push_str("# TYPE driftguard_events_total counter\n");
        output.push_str(&format!(
            "driftguard_events_total{{kind=\"drift\"}} {}\n",
            self.drift_events.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "driftguard_events_total{{kind=\"secret\"}} {}\n",
            self.secret_events.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP driftguard_latest_drift_score Latest drift anomaly score\n");
        output.push_str("# TYPE driftguard_latest_drift_score gauge\n");
        output.push_str(&format!(
            "driftguard_latest_drift_score {}\n",
            self.latest_drift_score()
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
