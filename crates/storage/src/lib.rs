//! Storage for normalized diagnostics.
//!
//! Provides:
//! - Store addressing and the zarr group layout for diagnostic arrays
//! - The relational run index (PostgreSQL) of model lineages and runs
//! - Object storage access (local or S3) and the parquet history archive

pub mod archive;
pub mod catalog;
pub mod group;
pub mod index;
pub mod object_store;
pub mod store;

pub use self::object_store::ObjectStorage;
pub use archive::{series_prefix, ArchivedValue, HistoryArchive};
pub use catalog::{Catalog, CatalogTransaction};
pub use group::{list_child_groups, list_runs, open_group, series_path, write_group, GroupPath};
pub use index::{
    Analysis, ModelMetadata, RunIndex, RunKey, RunRecord, RunTransaction, WeatherModel,
};
pub use store::{resolve, resolve_with, S3Credentials, StoreHandle, StoreLocation};
