//! modeld -- the DriftGuard anomaly-model service.
//!
//! Loads (or fits and persists) the outlier model synchronously, before the
//! listener binds, then serves read-only inference over HTTP.

mod api;
mod model;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use crate::model::OutlierModel;

#[derive(Parser)]
#[command(
    name = "modeld",
    about = "DriftGuard anomaly-model service",
    version,
    long_about = None
)]
struct Cli {
    /// Bind address
    #[arg(long, env = "MODELD_BIND", default_value = "0.0.0.0:8001")]
    bind: String,

    /// Path to the persisted model artifact
    #[arg(long, env = "MODELD_MODEL_PATH", default_value = "data/model.json")]
    model_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // One-way UNINITIALIZED -> READY transition; nothing is served until
    // the model is fitted or loaded.
    let model = Arc::new(OutlierModel::load_or_fit(&cli.model_path)?);
    tracing::info!(arity = model.arity(), "model ready");

    let addr: std::net::SocketAddr = cli.bind.parse()?;
    let app = api::router(model);

    tracing::info!(%addr, "modeld listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
