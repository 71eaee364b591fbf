//! Synthetic raw diagnostic files.
//!
//! These mirror the layout of data-assimilation diagnostic files: one array per
//! variable over the observation dimension, with vector components prefixed by
//! their component code (`u_Observation`, `v_Observation`, ...).

use ncdiag_parser::RawDiagnostic;

fn insert(raw: &mut RawDiagnostic, name: &str, values: &[f64]) {
    if let Err(e) = raw.insert(name, values.to_vec()) {
        panic!("invalid fixture variable {}: {}", name, e);
    }
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// A raw temperature diagnostic with three observations.
///
/// Longitudes are `[90, 270, 180]` (the second wraps to -90) and the analysis
/// use flags are `[1, -1, 1]`. With `with_forecast` unset, the `Forecast_*`
/// variables are omitted and must be derived.
pub fn scalar_raw_diagnostic(with_forecast: bool) -> RawDiagnostic {
    let observation = [1.0, 2.0, 3.0];
    let omf_adjusted = [0.25, -0.5, 1.0];
    let omf_unadjusted = [0.5, -1.0, 2.0];

    let mut raw = RawDiagnostic::new(3);
    insert(&mut raw, "Latitude", &[22.0, 23.0, 24.0]);
    insert(&mut raw, "Longitude", &[90.0, 270.0, 180.0]);
    insert(&mut raw, "Analysis_Use_Flag", &[1.0, -1.0, 1.0]);
    insert(&mut raw, "Observation", &observation);
    insert(&mut raw, "Obs_Minus_Forecast_adjusted", &omf_adjusted);
    insert(&mut raw, "Obs_Minus_Forecast_unadjusted", &omf_unadjusted);

    if with_forecast {
        insert(&mut raw, "Forecast_adjusted", &sub(&observation, &omf_adjusted));
        insert(&mut raw, "Forecast_unadjusted", &sub(&observation, &omf_unadjusted));
    }

    raw
}

/// A raw wind diagnostic with two observations and u/v components.
pub fn wind_raw_diagnostic(with_forecast: bool) -> RawDiagnostic {
    let mut raw = RawDiagnostic::new(2);
    insert(&mut raw, "Latitude", &[40.0, 41.0]);
    insert(&mut raw, "Longitude", &[255.0, 256.0]);
    insert(&mut raw, "Analysis_Use_Flag", &[1.0, 0.0]);

    for (component, observation, omf) in [
        ("u", [10.0, -10.0], [1.0, -1.0]),
        ("v", [0.0, 10.0], [0.5, 2.0]),
    ] {
        let name = |var: &str| format!("{}_{}", component, var);
        insert(&mut raw, &name("Observation"), &observation);
        insert(&mut raw, &name("Obs_Minus_Forecast_adjusted"), &omf);
        insert(&mut raw, &name("Obs_Minus_Forecast_unadjusted"), &omf);
        if with_forecast {
            insert(&mut raw, &name("Forecast_adjusted"), &sub(&observation, &omf));
            insert(&mut raw, &name("Forecast_unadjusted"), &sub(&observation, &omf));
        }
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_raw_without_forecast() {
        let raw = scalar_raw_diagnostic(false);
        assert_eq!(raw.nobs(), 3);
        assert!(!raw.contains("Forecast_adjusted"));
        assert!(scalar_raw_diagnostic(true).contains("Forecast_adjusted"));
    }

    #[test]
    fn test_wind_raw_prefixes_components() {
        let raw = wind_raw_diagnostic(true);
        assert!(raw.contains("u_Observation"));
        assert!(raw.contains("v_Forecast_unadjusted"));
        assert!(!raw.contains("Observation"));
    }
}
