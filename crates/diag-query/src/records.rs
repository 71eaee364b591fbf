//! Tabular views of a filtered dataset.

use serde::Serialize;
use serde_json::{Map, Value};

use diag_common::{Field, FieldValue, NormalizedDataset};

use crate::vector::vector_magnitude;

/// Value fields included in record views, in output order.
const RECORD_FIELDS: [&str; 3] = [
    "obs_minus_forecast_adjusted",
    "obs_minus_forecast_unadjusted",
    "observation",
];

/// One JSON object per observation.
pub type Record = Map<String, Value>;

/// One record per observation with the innovation and observation values and
/// the position. Vector fields become one key per component, suffixed with the
/// component label (`observation_u`, `observation_v`).
pub fn records(dataset: &NormalizedDataset) -> Vec<Record> {
    let fields: Vec<(&str, &Field)> = RECORD_FIELDS
        .iter()
        .filter_map(|&name| dataset.field(name).map(|field| (name, field)))
        .collect();

    (0..dataset.nobs())
        .map(|idx| {
            let mut record = Map::new();
            for (name, field) in &fields {
                match (field, &dataset.components) {
                    (Field::Vector(columns), Some(labels)) => {
                        for (column, label) in columns.iter().zip(labels) {
                            record.insert(format!("{}_{}", name, label), Value::from(column[idx]));
                        }
                    }
                    _ => {
                        if let FieldValue::Scalar(value) = field.at(idx) {
                            record.insert(name.to_string(), Value::from(value));
                        }
                    }
                }
            }
            record.insert("longitude".to_string(), Value::from(dataset.longitude[idx]));
            record.insert("latitude".to_string(), Value::from(dataset.latitude[idx]));
            record
        })
        .collect()
}

/// An observation reduced to magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagnitudeRecord {
    pub obs_minus_forecast_adjusted: f64,
    pub obs_minus_forecast_unadjusted: f64,
    pub observation: f64,
    pub longitude: f64,
    pub latitude: f64,
}

/// Reduce every observation's values to a magnitude: vectors to their length,
/// scalars to their absolute value.
pub fn magnitude(dataset: &NormalizedDataset) -> Vec<MagnitudeRecord> {
    (0..dataset.nobs())
        .map(|idx| MagnitudeRecord {
            obs_minus_forecast_adjusted: reduce(dataset.obs_minus_forecast_adjusted.at(idx)),
            obs_minus_forecast_unadjusted: reduce(dataset.obs_minus_forecast_unadjusted.at(idx)),
            observation: reduce(dataset.observation.at(idx)),
            longitude: dataset.longitude[idx],
            latitude: dataset.latitude[idx],
        })
        .collect()
}

pub(crate) fn reduce(value: FieldValue) -> f64 {
    match value {
        FieldValue::Scalar(x) => x.abs(),
        FieldValue::Vector(components) => match components.as_slice() {
            [u, v] => vector_magnitude(*u, *v),
            other => other.iter().map(|c| c * c).sum::<f64>().sqrt(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{scalar_dataset, wind_dataset};

    #[test]
    fn test_scalar_records() {
        let rows = records(&scalar_dataset());
        assert_eq!(rows.len(), 3);
        assert_eq!(
            Value::Object(rows[1].clone()),
            json!({
                "obs_minus_forecast_adjusted": -0.5,
                "obs_minus_forecast_unadjusted": -1.0,
                "observation": 2.0,
                "longitude": -90.0,
                "latitude": 23.0,
            })
        );
    }

    #[test]
    fn test_vector_records_use_component_suffixes() {
        let rows = records(&wind_dataset());
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({
                "obs_minus_forecast_adjusted_u": 0.5,
                "obs_minus_forecast_adjusted_v": 0.0,
                "obs_minus_forecast_unadjusted_u": 1.0,
                "obs_minus_forecast_unadjusted_v": 0.0,
                "observation_u": 10.0,
                "observation_v": 0.0,
                "longitude": -105.0,
                "latitude": 40.0,
            })
        );
    }

    #[test]
    fn test_scalar_magnitude_is_absolute_value() {
        let rows = magnitude(&scalar_dataset());
        assert_eq!(rows[1].obs_minus_forecast_unadjusted, 1.0);
        assert_eq!(rows[1].obs_minus_forecast_adjusted, 0.5);
        assert_eq!(rows[1].latitude, 23.0);
    }

    #[test]
    fn test_vector_magnitude() {
        let rows = magnitude(&wind_dataset());
        assert_eq!(rows[3].observation, 5.0);
        assert_eq!(rows[0].obs_minus_forecast_unadjusted, 1.0);
        assert_eq!(rows[3].obs_minus_forecast_adjusted, 0.0);
    }
}
