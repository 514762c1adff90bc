//! pdm-engine - predictive-maintenance inference service
//!
//! Trains the fault, severity and RUL models on a synthetic corpus at
//! startup and serves predictions over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Train and serve on the configured address (default 0.0.0.0:8000)
//! pdm-engine
//!
//! # One-shot prediction, printed as JSON
//! pdm-engine predict --temperature 72 --vibration 4.1 --pressure 118 --rpm 2250
//!
//! # Train with a specific seed and print the model summary
//! pdm-engine train --seed 7
//! ```
//!
//! # Environment Variables
//!
//! - `PDM_CONFIG`: path to a TOML config file (default: ./pdm_config.toml)
//! - `PDM_SERVER_ADDR`: HTTP bind address, overridden by `--addr`
//! - `PDM_CORS_ORIGINS`: comma-separated allowed origins (default: any)
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pdm_engine::api::{create_app, ServiceState};
use pdm_engine::config::EngineConfig;
use pdm_engine::ml_engine::InferenceEngine;
use pdm_engine::types::SensorReading;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pdm-engine")]
#[command(about = "Predictive-maintenance inference engine")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default from config: "0.0.0.0:8000")
    #[arg(short, long, global = true)]
    addr: Option<String>,

    /// Load configuration from this TOML file instead of the search order
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Train the models and serve the HTTP API (default)
    Serve,

    /// Train, evaluate one reading and print the result as JSON
    Predict {
        /// Temperature (°C)
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,
        /// Vibration (mm/s)
        #[arg(long, allow_negative_numbers = true)]
        vibration: f64,
        /// Pressure (PSI)
        #[arg(long, allow_negative_numbers = true)]
        pressure: f64,
        /// Rotational speed (RPM)
        #[arg(long, allow_negative_numbers = true)]
        rpm: f64,
    },

    /// Run one training phase and print the model summary
    Train {
        /// Seed for corpus generation and model fitting (default from config)
        #[arg(long)]
        seed: Option<u64>,
    },
}

// ============================================================================
// Configuration
// ============================================================================

/// Process-level settings that live outside the TOML file.
#[derive(Debug, Clone)]
struct AppConfig {
    server_addr: Option<String>,
}

impl AppConfig {
    fn from_env() -> Self {
        Self {
            server_addr: std::env::var("PDM_SERVER_ADDR").ok(),
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(EngineConfig::load()),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn serve(engine: Arc<InferenceEngine>, addr: String) -> Result<()> {
    let trainer = Arc::clone(&engine);
    let bundle = tokio::task::spawn_blocking(move || trainer.train())
        .await
        .context("Training task panicked")?
        .context("Initial training failed")?;
    info!(
        seed = bundle.seed,
        samples = bundle.sample_count,
        "Models ready"
    );

    let app = create_app(ServiceState::new(engine));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await
        .context("HTTP server error")?;

    info!("Shutdown complete");
    Ok(())
}

fn predict(engine: &InferenceEngine, reading: SensorReading) -> Result<()> {
    let result = engine.predict(&reading).context("Prediction failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn train(engine: &InferenceEngine, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or(engine.config().generator.seed);
    let bundle = engine.train_with_seed(seed).context("Training failed")?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let engine_config = load_config(args.config.as_ref())?;
    info!(
        samples = engine_config.generator.sample_count,
        seed = engine_config.generator.seed,
        fault_trees = engine_config.models.fault_trees,
        severity_trees = engine_config.models.severity_trees,
        rul_trees = engine_config.models.rul_trees,
        neighbors = engine_config.retrieval.neighbors,
        "Engine configuration loaded"
    );

    let server_addr = args
        .addr
        .or(AppConfig::from_env().server_addr)
        .unwrap_or_else(|| engine_config.server.addr.clone());

    let engine = Arc::new(InferenceEngine::new(engine_config));

    match args.command.unwrap_or(SubCommand::Serve) {
        SubCommand::Serve => serve(engine, server_addr).await,
        SubCommand::Predict {
            temperature,
            vibration,
            pressure,
            rpm,
        } => {
            let reading = SensorReading::new(temperature, vibration, pressure, rpm);
            tokio::task::spawn_blocking(move || predict(&engine, reading))
                .await
                .context("Prediction task panicked")?
        }
        SubCommand::Train { seed } => tokio::task::spawn_blocking(move || train(&engine, seed))
            .await
            .context("Training task panicked")?,
    }
}
