use std::sync::Arc;

use crate::metrics::Metrics;
use crate::score::ScoringEngine;
use crate::storage::Pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub engine: Arc<ScoringEngine>,
    pub metrics: Arc<Metrics>,
    pub api_token: Arc<String>,
}
