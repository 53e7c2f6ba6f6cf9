//! TOML configuration for the DriftGuard daemon.
//!
//! Every field has a sensible default so the daemon runs with no config file
//! at all. A TOML file can be passed via `--config`; the API token and the
//! anomaly-model service URL can additionally be overridden through the
//! `DRIFTGUARD_API_TOKEN` and `DRIFTGUARD_MODEL_URL` environment variables,
//! matching how the service is configured in container deployments.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Root configuration for the DriftGuard process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shared bearer token for the scoring endpoints.
    #[serde(default = "default_api_token")]
    pub api_token: String,

    /// Path to the SQLite event database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Base URL of the anomaly-model service.
    #[serde(default = "default_model_url")]
    pub model_url: String,

    /// Timeout for a single model call, in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
}

fn default_api_token() -> String {
    "devtoken".to_string()
}

fn default_db_path() -> String {
    "data/events.db".to_string()
}

fn default_model_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_model_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: default_api_token(),
            db_path: default_db_path(),
            model_url: default_model_url(),
            model_timeout_secs: default_model_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config.with_env_overrides())
    }

    /// Load from an optional path, falling back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default().with_env_overrides()),
        }
    }

    /// Apply environment variable overrides on top of file/default values.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("DRIFTGUARD_API_TOKEN") {
            self.api_token = token;
        }
        if let Ok(url) = std::env::var("DRIFTGUARD_MODEL_URL") {
            self.model_url = url;
        }
        self
    }
}
