//! Diagnostic ingester service.
//!
//! Listens for object-created storage events and ingests the diagnostic files
//! they name.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use ingester::{build_router, IngesterConfig, ObjectSource, ServerState};
use ingestion::{FetchConfig, Ingester};
use storage::{resolve_with, Catalog, HistoryArchive, ObjectStorage, S3Credentials};

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Ingests data-assimilation diagnostic files from storage events")]
struct Args {
    /// Listen address (defaults to LISTEN_ADDR, or 0.0.0.0:$PORT)
    #[arg(short, long)]
    listen: Option<String>,

    /// Ingest one local diagnostic file and exit
    #[arg(long)]
    file: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Starting diagnostic ingester");

    let mut config = IngesterConfig::from_env()?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let credentials = S3Credentials::from_env();
    let store = resolve_with(&config.zarr_uri, &credentials)?;
    let archive = HistoryArchive::new(ObjectStorage::from_uri(&config.parquet_uri, &credentials)?);

    let catalog = Catalog::connect(&config.database_url)
        .await
        .context("Failed to connect to the run index")?;
    catalog.migrate().await?;

    let ingester = Ingester::new(store, Arc::new(catalog)).with_archive(archive);

    if let Some(file) = &args.file {
        let outcome = ingester.ingest_file(Path::new(file)).await?;
        info!(group = %outcome.group, nobs = outcome.nobs, "Ingested local file");
        return Ok(());
    }

    let source = match &config.source_uri {
        Some(uri) => ObjectSource::Fixed(ObjectStorage::from_uri(uri, &credentials)?),
        None => ObjectSource::Buckets(credentials),
    };

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.download_dir.display()))?;

    let state = Arc::new(ServerState {
        ingester,
        source,
        fetch: FetchConfig {
            key_prefix: config.key_prefix.clone(),
            download_dir: config.download_dir.clone(),
        },
    });

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(address = %config.listen_addr, "Ingester listening");

    axum::serve(listener, app).await?;
    Ok(())
}
