//! Normalized dataset fixtures.

use diag_common::{Field, NormalizedDataset, RunAttributes};

/// Initialization time shared by the fixtures.
pub const INIT_TIME: &str = "2022-05-05T14:00";

/// Run attributes for the RTMA/WCOSS/CONUS/REALTIME lineage over HRRR.
pub fn run_attributes(name: &str, loop_: &str) -> RunAttributes {
    RunAttributes {
        name: name.to_string(),
        loop_: loop_.to_string(),
        initialization_time: INIT_TIME.to_string(),
        model: "RTMA".to_string(),
        system: "WCOSS".to_string(),
        domain: "CONUS".to_string(),
        frequency: "REALTIME".to_string(),
        background: "HRRR".to_string(),
    }
}

fn forecast(observation: &[f64], omf: &[f64]) -> Vec<f64> {
    observation.iter().zip(omf).map(|(o, d)| o - d).collect()
}

/// Three temperature observations; the second is not used by the analysis.
///
/// | obs | lat | lon  | is_used | observation | omf unadjusted | omf adjusted |
/// |-----|-----|------|---------|-------------|----------------|--------------|
/// | 0   | 22  | 90   | true    | 1.0         | 0.5            | 0.25         |
/// | 1   | 23  | -90  | false   | 2.0         | -1.0           | -0.5         |
/// | 2   | 24  | 180  | true    | 3.0         | 2.0            | 1.0          |
pub fn scalar_dataset() -> NormalizedDataset {
    let observation = vec![1.0, 2.0, 3.0];
    let omf_unadjusted = vec![0.5, -1.0, 2.0];
    let omf_adjusted = vec![0.25, -0.5, 1.0];

    NormalizedDataset {
        latitude: vec![22.0, 23.0, 24.0],
        longitude: vec![90.0, -90.0, 180.0],
        is_used: vec![true, false, true],
        components: None,
        forecast_unadjusted: Field::Scalar(forecast(&observation, &omf_unadjusted)),
        forecast_adjusted: Field::Scalar(forecast(&observation, &omf_adjusted)),
        observation: Field::Scalar(observation),
        obs_minus_forecast_unadjusted: Field::Scalar(omf_unadjusted),
        obs_minus_forecast_adjusted: Field::Scalar(omf_adjusted),
        attributes: run_attributes("t", "anl"),
    }
}

/// Four wind observations with u/v components; the last is not used.
pub fn wind_dataset() -> NormalizedDataset {
    let observation = vec![vec![10.0, 0.0, -10.0, 3.0], vec![0.0, 10.0, -10.0, 4.0]];
    let omf_unadjusted = vec![vec![1.0, 0.0, -1.0, 0.0], vec![0.0, 1.0, -1.0, 0.0]];
    let omf_adjusted = vec![vec![0.5, 0.0, -0.5, 0.0], vec![0.0, 0.5, -0.5, 0.0]];

    let forecasts = |omf: &[Vec<f64>]| {
        observation
            .iter()
            .zip(omf)
            .map(|(o, d)| forecast(o, d))
            .collect::<Vec<_>>()
    };

    NormalizedDataset {
        latitude: vec![40.0, 41.0, 42.0, 43.0],
        longitude: vec![-105.0, -104.0, -103.0, -102.0],
        is_used: vec![true, true, true, false],
        components: Some(vec!["u".to_string(), "v".to_string()]),
        forecast_unadjusted: Field::Vector(forecasts(&omf_unadjusted)),
        forecast_adjusted: Field::Vector(forecasts(&omf_adjusted)),
        observation: Field::Vector(observation.clone()),
        obs_minus_forecast_unadjusted: Field::Vector(omf_unadjusted),
        obs_minus_forecast_adjusted: Field::Vector(omf_adjusted),
        attributes: run_attributes("uv", "ges"),
    }
}
