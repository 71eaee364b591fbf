//! Application state.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use diag_query::DiagnosticService;
use storage::{resolve, Catalog, HistoryArchive, ObjectStorage, S3Credentials};

use crate::config::ApiConfig;

/// Shared application state.
pub struct AppState {
    pub service: DiagnosticService,
}

impl AppState {
    /// Connect to the array store, history archive and run index.
    pub async fn new(config: &ApiConfig) -> Result<Self> {
        let credentials = S3Credentials::from_env();

        let store = resolve(&config.zarr_uri)?;
        let archive = HistoryArchive::new(ObjectStorage::from_uri(&config.parquet_uri, &credentials)?);

        let catalog = Catalog::connect(&config.database_url).await?;
        catalog.migrate().await?;
        info!(zarr = %config.zarr_uri, parquet = %config.parquet_uri, "Connected to diagnostic stores");

        Ok(Self::from_service(DiagnosticService::new(store, archive, Arc::new(catalog))))
    }

    pub fn from_service(service: DiagnosticService) -> Self {
        Self { service }
    }
}
