//! Ingester configuration.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default listen port when neither `LISTEN_ADDR` nor `PORT` is set.
const DEFAULT_PORT: u16 = 8081;

/// Top-level ingester configuration.
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    /// Array store URI (path, `file://` or `s3://`)
    pub zarr_uri: String,
    /// History archive URI
    pub parquet_uri: String,
    pub database_url: String,
    /// Prefix stripped from object keys when naming fetched files
    pub key_prefix: Option<String>,
    /// Directory fetched objects are written to
    pub download_dir: PathBuf,
    /// Read every object from this URI instead of the bucket named by the event
    pub source_uri: Option<String>,
    pub listen_addr: String,
}

impl IngesterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

        let zarr_uri = var("UG_DIAG_ZARR").context("UG_DIAG_ZARR must be set")?;
        let parquet_uri = var("UG_DIAG_PARQUET").context("UG_DIAG_PARQUET must be set")?;
        let database_url = var("DATABASE_URL")
            .or_else(|| var("FLASK_SQLALCHEMY_DATABASE_URI"))
            .context("DATABASE_URL must be set")?;

        let download_dir = var("UG_DIAG_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let listen_addr = var("LISTEN_ADDR").unwrap_or_else(|| {
            let port = var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT);
            format!("0.0.0.0:{}", port)
        });

        Ok(Self {
            zarr_uri,
            parquet_uri,
            database_url,
            key_prefix: var("UG_DIAG_KEY_PREFIX"),
            download_dir,
            source_uri: var("UG_DIAG_SOURCE"),
            listen_addr,
        })
    }
}
