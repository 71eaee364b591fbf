//! Conversion of raw diagnostic arrays into the normalized dataset layout.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, instrument};

use diag_common::{DiagError, DiagResult, Field, NormalizedDataset, RunAttributes, FIELD_NAMES, UNKNOWN};
use ncdiag_parser::{load_raw_diagnostic, RawDiagnostic};

use crate::error::{IngestionError, Result};
use crate::metadata::{parse_diag_filename, DiagMeta};

const LATITUDE: &str = "Latitude";
const LONGITUDE: &str = "Longitude";
const USE_FLAG: &str = "Analysis_Use_Flag";
const OBSERVATION: &str = "Observation";

/// Source variable holding each normalized field, in `FIELD_NAMES` order.
const SOURCE_NAMES: [&str; 5] = [
    OBSERVATION,
    "Forecast_unadjusted",
    "Forecast_adjusted",
    "Obs_Minus_Forecast_unadjusted",
    "Obs_Minus_Forecast_adjusted",
];

/// Forecast flavors that can be derived as `Observation - Obs_Minus_Forecast_<flavor>`.
const FLAVORS: [&str; 2] = ["unadjusted", "adjusted"];

/// Read and normalize a diagnostic file. Run metadata comes from the file name.
#[instrument(fields(path = %path.display()))]
pub fn load(path: &Path) -> Result<NormalizedDataset> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestionError::Diag(DiagError::InvalidFilename(path.display().to_string())))?;
    let meta = parse_diag_filename(filename)?;
    let raw = load_raw_diagnostic(path)?;
    Ok(normalize(&raw, &meta)?)
}

/// Normalize raw diagnostic arrays using run metadata from the file name.
///
/// Longitudes above 180 are shifted into [-180, 180], `is_used` is true only
/// where the analysis use flag equals 1, and missing forecast variables are
/// derived from the observation and its innovation.
pub fn normalize(raw: &RawDiagnostic, meta: &DiagMeta) -> DiagResult<NormalizedDataset> {
    let components = (meta.variables.len() > 1).then(|| meta.variables.clone());
    let source = Source::new(raw, components.as_deref())?;

    let latitude = source.require(LATITUDE)?.to_vec();
    let longitude = source
        .require(LONGITUDE)?
        .iter()
        .map(|&lon| if lon > 180.0 { lon - 360.0 } else { lon })
        .collect();
    let is_used = source.require(USE_FLAG)?.iter().map(|&flag| flag == 1.0).collect();

    let mut fields = Vec::with_capacity(FIELD_NAMES.len());
    for name in SOURCE_NAMES {
        fields.push(source.field(name)?);
    }
    let fields: [Field; 5] = fields
        .try_into()
        .map_err(|_| DiagError::Internal("expected five diagnostic fields".to_string()))?;

    let dataset = NormalizedDataset::try_new(
        latitude,
        longitude,
        is_used,
        components,
        fields,
        run_attributes(meta),
    )?;
    debug!(nobs = dataset.nobs(), name = %dataset.attributes.name, "Normalized diagnostic");
    Ok(dataset)
}

fn run_attributes(meta: &DiagMeta) -> RunAttributes {
    let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| UNKNOWN.to_string());
    RunAttributes {
        name: meta.name(),
        loop_: meta.loop_.clone(),
        initialization_time: meta.initialization_time.clone(),
        model: or_unknown(&meta.model),
        system: or_unknown(&meta.system),
        domain: or_unknown(&meta.domain),
        frequency: or_unknown(&meta.frequency),
        background: or_unknown(&meta.background),
    }
}

/// Raw arrays plus any derived forecast arrays.
struct Source<'a> {
    raw: &'a RawDiagnostic,
    components: Option<&'a [String]>,
    derived: HashMap<String, Vec<f64>>,
}

impl<'a> Source<'a> {
    fn new(raw: &'a RawDiagnostic, components: Option<&'a [String]>) -> DiagResult<Self> {
        let mut source = Self {
            raw,
            components,
            derived: HashMap::new(),
        };

        for key in source.prefixes() {
            for flavor in FLAVORS {
                let forecast = format!("{}Forecast_{}", key, flavor);
                if raw.contains(&forecast) {
                    continue;
                }
                let observation = source.require(&format!("{}{}", key, OBSERVATION))?;
                let innovation = source.require(&format!("{}Obs_Minus_Forecast_{}", key, flavor))?;
                let values = observation.iter().zip(innovation).map(|(o, d)| o - d).collect();
                source.derived.insert(forecast, values);
            }
        }

        Ok(source)
    }

    /// Variable name prefixes: `u_`, `v_` for vectors, empty for scalars.
    fn prefixes(&self) -> Vec<String> {
        match self.components {
            Some(components) => components.iter().map(|c| format!("{}_", c)).collect(),
            None => vec![String::new()],
        }
    }

    fn require(&self, name: &str) -> DiagResult<&[f64]> {
        self.derived
            .get(name)
            .map(Vec::as_slice)
            .or_else(|| self.raw.get(name))
            .ok_or_else(|| DiagError::MissingField(name.to_string()))
    }

    fn field(&self, name: &str) -> DiagResult<Field> {
        match self.components {
            Some(_) => self
                .prefixes()
                .iter()
                .map(|prefix| self.require(&format!("{}{}", prefix, name)).map(<[f64]>::to_vec))
                .collect::<DiagResult<Vec<_>>>()
                .map(Field::Vector),
            None => Ok(Field::Scalar(self.require(name)?.to_vec())),
        }
    }
}
