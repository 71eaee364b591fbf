//! Service configuration.

use std::env;

use anyhow::{Context, Result};

/// Default listen port when neither `LISTEN_ADDR` nor `PORT` is set.
const DEFAULT_PORT: u16 = 8080;

/// Where the service reads diagnostics from.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Array store URI (path, `file://` or `s3://`)
    pub zarr_uri: String,
    /// History archive URI
    pub parquet_uri: String,
    pub database_url: String,
    pub listen_addr: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let zarr_uri = env::var("UG_DIAG_ZARR").context("UG_DIAG_ZARR must be set")?;
        let parquet_uri = env::var("UG_DIAG_PARQUET").context("UG_DIAG_PARQUET must be set")?;
        let database_url = database_url_from_env()?;
        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| {
            let port = env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT);
            format!("0.0.0.0:{}", port)
        });

        Ok(Self {
            zarr_uri,
            parquet_uri,
            database_url,
            listen_addr,
        })
    }
}

/// `DATABASE_URL`, falling back to the legacy `FLASK_SQLALCHEMY_DATABASE_URI`.
pub fn database_url_from_env() -> Result<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("FLASK_SQLALCHEMY_DATABASE_URI"))
        .context("DATABASE_URL must be set")
}
