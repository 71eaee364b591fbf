//! Diagnostic variable and minimization loop vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiagError;

/// A diagnostic variable, as named in diag file names and group paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "ps")]
    Pressure,
    #[serde(rename = "q")]
    Moisture,
    #[serde(rename = "t")]
    Temperature,
    #[serde(rename = "uv")]
    Wind,
}

/// Whether a variable has one value per observation or one per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Scalar,
    Vector,
}

impl Variable {
    pub const ALL: [Variable; 4] = [
        Variable::Pressure,
        Variable::Moisture,
        Variable::Temperature,
        Variable::Wind,
    ];

    /// Short code used in file names and store paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Pressure => "ps",
            Variable::Moisture => "q",
            Variable::Temperature => "t",
            Variable::Wind => "uv",
        }
    }

    /// Component codes. Scalars have a single component named after the variable.
    pub fn components(&self) -> &'static [&'static str] {
        match self {
            Variable::Pressure => &["ps"],
            Variable::Moisture => &["q"],
            Variable::Temperature => &["t"],
            Variable::Wind => &["u", "v"],
        }
    }

    pub fn variable_type(&self) -> VariableType {
        if self.components().len() > 1 {
            VariableType::Vector
        } else {
            VariableType::Scalar
        }
    }

    /// Human-readable name ("pressure", "wind", ...).
    pub fn long_name(&self) -> &'static str {
        match self {
            Variable::Pressure => "pressure",
            Variable::Moisture => "moisture",
            Variable::Temperature => "temperature",
            Variable::Wind => "wind",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                DiagError::invalid_parameter("variable", format!("unknown variable '{}'", s))
            })
    }
}

/// Minimization loop of interest to clients: the first guess or the final analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinimLoop {
    #[serde(rename = "ges")]
    Guess,
    #[serde(rename = "anl")]
    Analysis,
}

impl MinimLoop {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinimLoop::Guess => "ges",
            MinimLoop::Analysis => "anl",
        }
    }
}

impl fmt::Display for MinimLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinimLoop {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ges" => Ok(MinimLoop::Guess),
            "anl" => Ok(MinimLoop::Analysis),
            other => Err(DiagError::invalid_parameter(
                "loop",
                format!("unknown minimization loop '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_round_trip_codes() {
        for v in Variable::ALL {
            assert_eq!(v.as_str().parse::<Variable>().unwrap(), v);
        }
        assert!("w".parse::<Variable>().is_err());
    }

    #[test]
    fn test_wind_is_vector() {
        assert_eq!(Variable::Wind.variable_type(), VariableType::Vector);
        assert_eq!(Variable::Wind.components(), &["u", "v"]);
        assert_eq!(Variable::Temperature.variable_type(), VariableType::Scalar);
    }

    #[test]
    fn test_loop_parse() {
        assert_eq!("anl".parse::<MinimLoop>().unwrap(), MinimLoop::Analysis);
        assert_eq!("ges".parse::<MinimLoop>().unwrap(), MinimLoop::Guess);
        assert!("01".parse::<MinimLoop>().is_err());
    }
}
