//! Time-series summaries of archived innovations.

use std::collections::BTreeMap;

use serde::Serialize;

use storage::ArchivedValue;

/// Summary of one run's unadjusted observation-minus-forecast values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub initialization_time: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Number of non-NaN values
    pub count: u64,
}

#[derive(Default)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn finish(self, initialization_time: String) -> HistoryPoint {
        let stat = |value: f64| (self.count > 0).then_some(value);
        HistoryPoint {
            initialization_time,
            min: stat(self.min),
            max: stat(self.max),
            mean: stat(self.sum / self.count.max(1) as f64),
            count: self.count,
        }
    }
}

/// Group archived values by initialization time and reduce each group to its
/// minimum, maximum, mean and count, ordered by initialization time.
///
/// NaN values are not counted. An empty input gives an empty summary.
pub fn summarize(values: &[ArchivedValue]) -> Vec<HistoryPoint> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for value in values {
        groups
            .entry(value.initialization_time.as_str())
            .or_default()
            .push(value.obs_minus_forecast_unadjusted);
    }

    groups
        .into_iter()
        .map(|(time, acc)| acc.finish(time.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn value(time: &str, omf: f64) -> ArchivedValue {
        ArchivedValue {
            initialization_time: time.to_string(),
            obs_minus_forecast_unadjusted: omf,
        }
    }

    #[test]
    fn test_empty_history() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn test_groups_are_sorted_and_summarized() {
        let points = summarize(&[
            value("2022-05-05T15:00", 3.0),
            value("2022-05-05T14:00", -1.0),
            value("2022-05-05T15:00", 1.0),
            value("2022-05-05T14:00", 2.0),
            value("2022-05-05T15:00", 2.0),
        ]);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].initialization_time, "2022-05-05T14:00");
        assert_eq!(points[0].min, Some(-1.0));
        assert_eq!(points[0].max, Some(2.0));
        assert_approx_eq!(points[0].mean.unwrap(), 0.5, 1e-12);
        assert_eq!(points[0].count, 2);

        assert_eq!(points[1].initialization_time, "2022-05-05T15:00");
        assert_approx_eq!(points[1].mean.unwrap(), 2.0, 1e-12);
        assert_eq!(points[1].count, 3);
    }

    #[test]
    fn test_nan_values_are_not_counted() {
        let points = summarize(&[value("t1", f64::NAN), value("t1", 4.0), value("t2", f64::NAN)]);
        assert_eq!(points[0].count, 1);
        assert_eq!(points[0].mean, Some(4.0));
        assert_eq!(points[1].count, 0);
        assert_eq!(points[1].min, None);
    }
}
