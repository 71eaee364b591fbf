//! Queries over stored diagnostics.
//!
//! Filtering of opened runs by coordinate ranges, record and magnitude views,
//! GeoJSON observations, and time-series history from the Parquet archive.

pub mod filter;
pub mod history;
pub mod observation;
pub mod records;
pub mod service;
pub mod vector;

pub use filter::{apply_filters, get_bounds, parse_filter_value, Bound, FilterValue};
pub use history::{summarize, HistoryPoint};
pub use observation::{feature_collection, observations, Coordinate, ObsValue, Observation, Vector};
pub use records::{magnitude, records, MagnitudeRecord, Record};
pub use service::{DiagnosticService, Series};
pub use vector::{vector_direction, vector_magnitude};
