//! Native NetCDF reading using the netcdf library.

use std::path::Path;
use std::sync::Once;

use tracing::{debug, instrument};

use crate::error::{NetCdfError, NetCdfResult};
use crate::raw::{RawDiagnostic, OBS_DIMENSION};

/// Attributes whose value marks an element as missing.
const MISSING_VALUE_ATTRIBUTES: [&str; 2] = ["_FillValue", "missing_value"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when a character variable
/// cannot be read as a number). It only needs to be called once per process,
/// but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Load every numeric, observation-indexed variable from a diagnostic file.
///
/// Variables that are not one-dimensional over `nobs`, or that cannot be read as
/// numbers (station ids and other character data), are skipped. Elements equal
/// to a variable's `_FillValue` or `missing_value` are read as NaN.
#[instrument(fields(path = %path.display()))]
pub fn load_raw_diagnostic(path: &Path) -> NetCdfResult<RawDiagnostic> {
    if !path.exists() {
        return Err(NetCdfError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("diagnostic file not found: {}", path.display()),
        )));
    }

    silence_hdf5_errors();

    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let nobs = file
        .dimension(OBS_DIMENSION)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} dimension", OBS_DIMENSION)))?
        .len();

    let mut raw = RawDiagnostic::new(nobs);
    for var in file.variables() {
        let name = var.name();
        let dims = var.dimensions();
        if dims.len() != 1 || dims[0].name() != OBS_DIMENSION {
            continue;
        }

        match var.get_values::<f64, _>(..) {
            Ok(mut values) => {
                mask_missing(&mut values, &missing_sentinels(&var));
                raw.insert(name, values)?
            }
            Err(e) => debug!(variable = %name, error = %e, "Skipping non-numeric variable"),
        }
    }

    debug!(nobs, variables = raw.names().count(), "Loaded diagnostic file");
    Ok(raw)
}

/// Numeric values of the missing-value attributes present on `var`.
fn missing_sentinels(var: &netcdf::Variable<'_>) -> Vec<f64> {
    use netcdf::AttributeValue as A;

    MISSING_VALUE_ATTRIBUTES
        .iter()
        .filter_map(|name| var.attribute(name))
        .filter_map(|attr| attr.value().ok())
        .flat_map(|value| match value {
            A::Double(v) => vec![v],
            A::Doubles(v) => v,
            A::Float(v) => vec![f64::from(v)],
            A::Floats(v) => v.into_iter().map(f64::from).collect(),
            A::Int(v) => vec![f64::from(v)],
            A::Ints(v) => v.into_iter().map(f64::from).collect(),
            A::Short(v) => vec![f64::from(v)],
            A::Shorts(v) => v.into_iter().map(f64::from).collect(),
            A::Schar(v) => vec![f64::from(v)],
            A::Uchar(v) => vec![f64::from(v)],
            A::Ushort(v) => vec![f64::from(v)],
            A::Uint(v) => vec![f64::from(v)],
            A::Longlong(v) => vec![v as f64],
            A::Ulonglong(v) => vec![v as f64],
            _ => Vec::new(),
        })
        .collect()
}

/// Replace every element equal to one of `sentinels` with NaN.
fn mask_missing(values: &mut [f64], sentinels: &[f64]) {
    if sentinels.is_empty() {
        return;
    }
    for value in values.iter_mut() {
        if sentinels.contains(value) {
            *value = f64::NAN;
        }
    }
}
