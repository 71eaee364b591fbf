//! Common types and utilities shared across the diagnostic ingestion and query services.

pub mod dataset;
pub mod error;
pub mod variable;

pub use dataset::{ColumnRef, Field, FieldValue, NormalizedDataset, RunAttributes, FIELD_NAMES, UNKNOWN};
pub use error::{DiagError, DiagResult};
pub use variable::{MinimLoop, Variable, VariableType};
