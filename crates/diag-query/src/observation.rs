//! Per-observation values and their GeoJSON representation.

use serde::Serialize;
use serde_json::{json, Value};

use diag_common::{DiagResult, FieldValue, MinimLoop, NormalizedDataset, Variable, VariableType};

use crate::records::reduce;

/// Decimal places kept for vector values and positions.
const VECTOR_PRECISION: i32 = 5;

/// A `(u, v)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vector {
    pub u: f64,
    pub v: f64,
}

/// A scalar value or a vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObsValue {
    Scalar(f64),
    Vector(Vector),
}

impl ObsValue {
    fn from_field(value: FieldValue) -> Self {
        match value {
            FieldValue::Scalar(x) => ObsValue::Scalar(x),
            FieldValue::Vector(components) if components.len() == 2 => ObsValue::Vector(Vector {
                u: round(components[0]),
                v: round(components[1]),
            }),
            vector => ObsValue::Scalar(reduce(vector)),
        }
    }
}

/// A `[longitude, latitude]` position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

/// One observation of a diagnostic variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Long variable name, e.g. "temperature"
    pub variable: String,
    pub variable_type: VariableType,
    pub loop_: MinimLoop,
    /// Adjusted observation-minus-forecast
    pub adjusted: ObsValue,
    /// Unadjusted observation-minus-forecast
    pub unadjusted: ObsValue,
    pub observed: ObsValue,
    pub position: Coordinate,
}

impl Observation {
    /// A GeoJSON `Feature` with a `Point` geometry.
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Feature",
            "properties": {
                "type": self.variable_type,
                "variable": self.variable,
                "loop": self.loop_,
                "adjusted": self.adjusted,
                "unadjusted": self.unadjusted,
                "observed": self.observed,
            },
            "geometry": {
                "type": "Point",
                "coordinates": [self.position.longitude, self.position.latitude],
            },
        })
    }
}

/// Observations of a dataset, in order. Vector values and the positions of
/// vector observations are rounded to five decimal places.
pub fn observations(dataset: &NormalizedDataset) -> DiagResult<Vec<Observation>> {
    let variable: Variable = dataset.attributes.name.parse()?;
    let loop_: MinimLoop = dataset.attributes.loop_.parse()?;
    let variable_type = variable.variable_type();
    let position = |idx: usize| {
        let (longitude, latitude) = (dataset.longitude[idx], dataset.latitude[idx]);
        match variable_type {
            VariableType::Vector => Coordinate {
                longitude: round(longitude),
                latitude: round(latitude),
            },
            VariableType::Scalar => Coordinate { longitude, latitude },
        }
    };

    Ok((0..dataset.nobs())
        .map(|idx| Observation {
            variable: variable.long_name().to_string(),
            variable_type,
            loop_,
            adjusted: ObsValue::from_field(dataset.obs_minus_forecast_adjusted.at(idx)),
            unadjusted: ObsValue::from_field(dataset.obs_minus_forecast_unadjusted.at(idx)),
            observed: ObsValue::from_field(dataset.observation.at(idx)),
            position: position(idx),
        })
        .collect())
}

/// A GeoJSON `FeatureCollection` of observations.
pub fn feature_collection(observations: &[Observation]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": observations.iter().map(Observation::to_geojson).collect::<Vec<_>>(),
    })
}

fn round(value: f64) -> f64 {
    let scale = 10f64.powi(VECTOR_PRECISION);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{scalar_dataset, wind_dataset};

    #[test]
    fn test_scalar_geojson() {
        let obs = observations(&scalar_dataset()).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(
            obs[0].to_geojson(),
            json!({
                "type": "Feature",
                "properties": {
                    "type": "scalar",
                    "variable": "temperature",
                    "loop": "anl",
                    "adjusted": 0.25,
                    "unadjusted": 0.5,
                    "observed": 1.0,
                },
                "geometry": {"type": "Point", "coordinates": [90.0, 22.0]},
            })
        );
    }

    #[test]
    fn test_vector_geojson() {
        let mut ds = wind_dataset();
        ds.longitude[0] = -105.123456789;
        let obs = observations(&ds).unwrap();

        let feature = obs[0].to_geojson();
        assert_eq!(feature["properties"]["type"], "vector");
        assert_eq!(feature["properties"]["variable"], "wind");
        assert_eq!(feature["properties"]["loop"], "ges");
        assert_eq!(feature["properties"]["observed"], json!({"u": 10.0, "v": 0.0}));
        assert_eq!(feature["properties"]["unadjusted"], json!({"u": 1.0, "v": 0.0}));
        assert_eq!(feature["geometry"]["coordinates"], json!([-105.12346, 40.0]));
    }

    #[test]
    fn test_feature_collection() {
        let obs = observations(&scalar_dataset()).unwrap();
        let collection = feature_collection(&obs);
        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(collection["features"].as_array().unwrap().len(), 3);
    }
}
