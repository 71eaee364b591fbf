//! The normalized, observation-indexed diagnostic dataset.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DiagError, DiagResult};

/// Placeholder recorded for run attributes that could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Value arrays carried by every normalized dataset, in storage order.
pub const FIELD_NAMES: [&str; 5] = [
    "observation",
    "forecast_unadjusted",
    "forecast_adjusted",
    "obs_minus_forecast_unadjusted",
    "obs_minus_forecast_adjusted",
];

const INIT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Attributes identifying the run a dataset belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAttributes {
    /// Variable short name: the component codes joined ("t", "uv").
    pub name: String,
    /// Minimization loop tag ("ges", "anl", "01", ...).
    #[serde(rename = "loop")]
    pub loop_: String,
    /// `YYYY-MM-DDTHH:MM`
    pub initialization_time: String,
    pub model: String,
    pub system: String,
    pub domain: String,
    pub frequency: String,
    pub background: String,
}

impl RunAttributes {
    /// Parse the initialization time.
    pub fn init_time(&self) -> DiagResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.initialization_time, INIT_TIME_FORMAT).map_err(|e| {
            DiagError::invalid_parameter(
                "initialization_time",
                format!("'{}': {}", self.initialization_time, e),
            )
        })
    }

    /// Attributes as a JSON object, as stored on a zarr group.
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Recover attributes from a zarr group's attribute map.
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> DiagResult<Self> {
        serde_json::from_value(serde_json::Value::Object(map.clone()))
            .map_err(|e| DiagError::MissingField(format!("group attributes: {}", e)))
    }
}

/// A value array, either one value per observation or one per observation and component.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Scalar(Vec<f64>),
    /// One column per component, each with one value per observation.
    Vector(Vec<Vec<f64>>),
}

/// The value(s) of a field at one observation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Field {
    /// Number of observations.
    pub fn len(&self) -> usize {
        match self {
            Field::Scalar(values) => values.len(),
            Field::Vector(columns) => columns.first().map(Vec::len).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component_count(&self) -> usize {
        match self {
            Field::Scalar(_) => 1,
            Field::Vector(columns) => columns.len(),
        }
    }

    pub fn at(&self, idx: usize) -> FieldValue {
        match self {
            Field::Scalar(values) => FieldValue::Scalar(values[idx]),
            Field::Vector(columns) => FieldValue::Vector(columns.iter().map(|c| c[idx]).collect()),
        }
    }

    /// Keep the observations at `keep`, in that order.
    pub fn select(&self, keep: &[usize]) -> Field {
        match self {
            Field::Scalar(values) => Field::Scalar(keep.iter().map(|&i| values[i]).collect()),
            Field::Vector(columns) => Field::Vector(
                columns
                    .iter()
                    .map(|c| keep.iter().map(|&i| c[i]).collect())
                    .collect(),
            ),
        }
    }

    /// Element-wise `self - other`. Both fields must share a shape.
    pub fn subtract(&self, other: &Field) -> DiagResult<Field> {
        fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
            a.iter().zip(b).map(|(x, y)| x - y).collect()
        }

        match (self, other) {
            (Field::Scalar(a), Field::Scalar(b)) if a.len() == b.len() => Ok(Field::Scalar(sub(a, b))),
            (Field::Vector(a), Field::Vector(b))
                if a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.len() == y.len()) =>
            {
                Ok(Field::Vector(a.iter().zip(b).map(|(x, y)| sub(x, y)).collect()))
            }
            _ => Err(DiagError::ShapeMismatch(
                "cannot subtract fields of different shapes".to_string(),
            )),
        }
    }
}

/// A borrowed view of one named array, used when filtering.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRef<'a> {
    Float(&'a [f64]),
    Bool(&'a [bool]),
    Vector(&'a [Vec<f64>]),
}

/// An observation-indexed diagnostic dataset for one variable of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDataset {
    pub latitude: Vec<f64>,
    /// Normalized to [-180, 180).
    pub longitude: Vec<f64>,
    pub is_used: Vec<bool>,
    /// Component labels for vector variables, `None` for scalars.
    pub components: Option<Vec<String>>,
    pub observation: Field,
    pub forecast_unadjusted: Field,
    pub forecast_adjusted: Field,
    pub obs_minus_forecast_unadjusted: Field,
    pub obs_minus_forecast_adjusted: Field,
    pub attributes: RunAttributes,
}

impl NormalizedDataset {
    /// Assemble a dataset, checking that every array spans the same observations
    /// and that vector fields agree with the component labels.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        is_used: Vec<bool>,
        components: Option<Vec<String>>,
        fields: [Field; 5],
        attributes: RunAttributes,
    ) -> DiagResult<Self> {
        let [observation, forecast_unadjusted, forecast_adjusted, obs_minus_forecast_unadjusted, obs_minus_forecast_adjusted] =
            fields;

        let dataset = Self {
            latitude,
            longitude,
            is_used,
            components,
            observation,
            forecast_unadjusted,
            forecast_adjusted,
            obs_minus_forecast_unadjusted,
            obs_minus_forecast_adjusted,
            attributes,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    fn validate(&self) -> DiagResult<()> {
        let nobs = self.latitude.len();
        if self.longitude.len() != nobs || self.is_used.len() != nobs {
            return Err(DiagError::ShapeMismatch(format!(
                "coordinates have lengths {}, {}, {}",
                nobs,
                self.longitude.len(),
                self.is_used.len()
            )));
        }

        for (name, field) in self.fields() {
            let expected_components = match (&self.components, field) {
                (None, Field::Scalar(_)) => None,
                (Some(labels), Field::Vector(columns)) => Some((labels.len(), columns)),
                _ => {
                    return Err(DiagError::ShapeMismatch(format!(
                        "{} does not match the dataset's component coordinate",
                        name
                    )))
                }
            };

            if let Some((count, columns)) = expected_components {
                if columns.len() != count || columns.iter().any(|c| c.len() != nobs) {
                    return Err(DiagError::ShapeMismatch(format!(
                        "{} must have {} components of {} observations",
                        name, count, nobs
                    )));
                }
            } else if field.len() != nobs {
                return Err(DiagError::ShapeMismatch(format!(
                    "{} has {} values, expected {}",
                    name,
                    field.len(),
                    nobs
                )));
            }
        }

        Ok(())
    }

    /// Number of observations.
    pub fn nobs(&self) -> usize {
        self.latitude.len()
    }

    pub fn is_vector(&self) -> bool {
        self.components.is_some()
    }

    /// The five value arrays with their names, in storage order.
    pub fn fields(&self) -> [(&'static str, &Field); 5] {
        [
            (FIELD_NAMES[0], &self.observation),
            (FIELD_NAMES[1], &self.forecast_unadjusted),
            (FIELD_NAMES[2], &self.forecast_adjusted),
            (FIELD_NAMES[3], &self.obs_minus_forecast_unadjusted),
            (FIELD_NAMES[4], &self.obs_minus_forecast_adjusted),
        ]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| f)
    }

    /// Look up a coordinate or value array by name.
    pub fn column(&self, name: &str) -> Option<ColumnRef<'_>> {
        match name {
            "latitude" => Some(ColumnRef::Float(&self.latitude)),
            "longitude" => Some(ColumnRef::Float(&self.longitude)),
            "is_used" => Some(ColumnRef::Bool(&self.is_used)),
            other => self.field(other).map(|field| match field {
                Field::Scalar(values) => ColumnRef::Float(values),
                Field::Vector(columns) => ColumnRef::Vector(columns),
            }),
        }
    }

    /// A new dataset holding only the observations at `keep`.
    pub fn select(&self, keep: &[usize]) -> NormalizedDataset {
        NormalizedDataset {
            latitude: keep.iter().map(|&i| self.latitude[i]).collect(),
            longitude: keep.iter().map(|&i| self.longitude[i]).collect(),
            is_used: keep.iter().map(|&i| self.is_used[i]).collect(),
            components: self.components.clone(),
            observation: self.observation.select(keep),
            forecast_unadjusted: self.forecast_unadjusted.select(keep),
            forecast_adjusted: self.forecast_adjusted.select(keep),
            obs_minus_forecast_unadjusted: self.obs_minus_forecast_unadjusted.select(keep),
            obs_minus_forecast_adjusted: self.obs_minus_forecast_adjusted.select(keep),
            attributes: self.attributes.clone(),
        }
    }

    /// Group-level attributes, including the component labels for vectors.
    pub fn group_attributes(&self) -> BTreeMap<String, serde_json::Value> {
        let mut attrs: BTreeMap<String, serde_json::Value> =
            self.attributes.to_json_map().into_iter().collect();
        if let Some(labels) = &self.components {
            attrs.insert("component".to_string(), serde_json::json!(labels));
        }
        attrs
    }
}
