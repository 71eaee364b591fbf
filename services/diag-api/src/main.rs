//! Diagnostics API server.
//!
//! Serves filtered diagnostics, magnitudes, history and model metadata.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use diag_api::config::ApiConfig;
use diag_api::router;
use diag_api::state::AppState;

/// Diagnostics API server
#[derive(Parser, Debug)]
#[command(name = "diag-api")]
#[command(about = "HTTP query service for data-assimilation diagnostics")]
struct Args {
    /// Listen address (defaults to LISTEN_ADDR, or 0.0.0.0:$PORT)
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "DIAG_API_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting diagnostics API server");

    let mut config = ApiConfig::from_env()?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let state = Arc::new(AppState::new(&config).await?);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(address = %config.listen_addr, "Diagnostics API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
