//! Diagnostic file ingestion library.
//!
//! Turns data-assimilation diagnostic files into normalized datasets and saves
//! them to the array store, the Parquet history archive and the run index.
//!
//! # Architecture
//!
//! - File name parsing for run metadata
//! - Normalization of raw NetCDF arrays
//! - The save orchestrator, which keeps the store write inside the index transaction
//! - Storage event handling for event-driven ingestion

pub mod error;
pub mod fetch;
mod ingester;
pub mod metadata;
pub mod normalize;

// Re-exports
pub use error::{IngestionError, Result};
pub use fetch::{
    decompress_gzip, fetch_record, local_name, remove_fetched, should_ingest, unquote_plus,
    EventOutcome, FetchConfig, StorageEvent,
};
pub use ingester::{Ingester, SaveOutcome};
pub use metadata::{parse_diag_filename, DiagMeta};
pub use normalize::{load, normalize};
