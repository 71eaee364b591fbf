//! In-memory representation of a raw diagnostic file.

use std::collections::BTreeMap;

use crate::error::{NetCdfError, NetCdfResult};

/// Name of the observation dimension in diagnostic files.
pub const OBS_DIMENSION: &str = "nobs";

/// Per-observation arrays read from a diagnostic file, keyed by variable name
/// (`Latitude`, `Observation`, `u_Obs_Minus_Forecast_adjusted`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDiagnostic {
    nobs: usize,
    variables: BTreeMap<String, Vec<f64>>,
}

impl RawDiagnostic {
    pub fn new(nobs: usize) -> Self {
        Self {
            nobs,
            variables: BTreeMap::new(),
        }
    }

    /// Number of observations.
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    /// Add or replace a variable. Its length must equal the observation count.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> NetCdfResult<()> {
        let name = name.into();
        if values.len() != self.nobs {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable {} has {} values but the file has {} observations",
                name,
                values.len(),
                self.nobs
            )));
        }
        self.variables.insert(name, values);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> NetCdfResult<Self> {
        self.insert(name, values)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}
