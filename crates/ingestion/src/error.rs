//! Error types for the ingestion crate.

use diag_common::DiagError;
use ncdiag_parser::NetCdfError;
use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Diag(#[from] DiagError),

    #[error("Failed to parse NetCDF data: {0}")]
    NetcdfParse(#[from] NetCdfError),

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Invalid storage event: {0}")]
    InvalidEvent(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl IngestionError {
    /// The underlying diagnostic error, if any.
    pub fn as_diag(&self) -> Option<&DiagError> {
        match self {
            IngestionError::Diag(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
