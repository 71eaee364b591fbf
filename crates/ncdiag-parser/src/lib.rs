//! NetCDF4 diagnostic file reader.
//!
//! Reads the observation-indexed arrays of a data-assimilation diagnostic file
//! into memory so they can be normalized without further file access.

pub mod error;
pub mod native;
pub mod raw;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{load_raw_diagnostic, silence_hdf5_errors};
pub use raw::{RawDiagnostic, OBS_DIMENSION};
