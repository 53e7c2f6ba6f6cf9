use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use driftguard::config::Config;
use driftguard::metrics::Metrics;
use driftguard::model::ModelClient;
use driftguard::score::ScoringEngine;

#[derive(Parser)]
#[command(
    name = "driftguard",
    about = "Drift and secret-leak risk scoring for deployment manifests",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (scoring API server + event store)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Score a manifest file for configuration drift
    CheckDrift {
        /// Path to the manifest file
        file: PathBuf,
    },

    /// Score a diff file for secret leaks
    CheckSecret {
        /// Path to the diff file
        file: PathBuf,
    },

    /// List the most recent persisted events
    Events {
        /// Maximum rows to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(%bind, "Starting DriftGuard daemon");
            driftguard::serve(&bind, config).await?;
        }
        Commands::CheckDrift { file } => {
            let manifest = std::fs::read_to_string(&file)?;
            let engine = one_shot_engine(&config)?;
            let outcome = engine.score_drift(&manifest, "cli").await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::CheckSecret { file } => {
            let diff = std::fs::read_to_string(&file)?;
            let engine = one_shot_engine(&config)?;
            let score = engine.score_secret(&diff).await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "score": score }))?);
        }
        Commands::Events { limit } => {
            let pool = driftguard::storage::open_pool(&config.db_path)?;
            let events = driftguard::storage::recent_events(&pool, limit)?;
            if events.is_empty() {
                println!("No events recorded.");
            } else {
                println!("{:<6} | {:<12} | {:<8} | Score", "ID", "Timestamp", "Kind");
                println!("{:-<6}-|-{:-<12}-|-{:-<8}-|-{:-<6}", "", "", "", "");
                for e in events {
                    println!("{:<6} | {:<12} | {:<8} | {:.3}", e.id, e.ts, e.kind, e.score);
                }
            }
        }
    }

    Ok(())
}

/// Build a scoring engine against the configured database, for one-shot
/// CLI commands. Uses the same fallback path as the daemon when the model
/// service is down.
fn one_shot_engine(config: &Config) -> Result<ScoringEngine> {
    let pool = driftguard::storage::open_pool(&config.db_path)?;
    let client = ModelClient::new(&config.model_url, config.model_timeout_secs)?;
    Ok(ScoringEngine::new(pool, client, Arc::new(Metrics::new())))
}
