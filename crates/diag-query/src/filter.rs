//! Range filters over dataset coordinates.
//!
//! A filter is a query-string pair such as `obs_minus_forecast_adjusted=-1::1`.
//! Each side of `::` is a comma-separated tuple aligned to vector components,
//! and the element-wise minimum and maximum across the sides form an inclusive
//! bound, so `2,4::3,1` and `3,1::2,4` both mean `[2, 1] ..= [3, 4]`.

use diag_common::{ColumnRef, DiagError, DiagResult, Field, NormalizedDataset};

/// Separator between the sides of a range.
const RANGE_SEPARATOR: &str = "::";

/// Coordinate whose implicit filter keeps only assimilated observations.
const IS_USED: &str = "is_used";

/// One parsed token of a filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

/// Parse one filter token: `true` is 1, `false` is 0, numbers parse as numbers
/// and anything else is kept as text. Surrounding whitespace is ignored.
pub fn parse_filter_value(token: &str) -> FilterValue {
    let token = token.trim();
    match token {
        "true" => FilterValue::Number(1.0),
        "false" => FilterValue::Number(0.0),
        _ => token
            .parse::<f64>()
            .map(FilterValue::Number)
            .unwrap_or_else(|_| FilterValue::Text(token.to_string())),
    }
}

/// An inclusive per-component bound on one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub coordinate: String,
    pub lower: Vec<FilterValue>,
    pub upper: Vec<FilterValue>,
}

impl Bound {
    /// Numeric bounds, one `(lower, upper)` pair per component.
    fn numeric(&self) -> DiagResult<Vec<(f64, f64)>> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|pair| match pair {
                (FilterValue::Number(lo), FilterValue::Number(hi)) => Ok((*lo, *hi)),
                _ => Err(DiagError::filter(
                    &self.coordinate,
                    "expected numeric or boolean bounds",
                )),
            })
            .collect()
    }
}

/// Compute the bound for every filter, in order. Repeated keys yield one bound each.
pub fn get_bounds(filters: &[(String, String)]) -> DiagResult<Vec<Bound>> {
    filters
        .iter()
        .map(|(coordinate, value)| bound(coordinate, value))
        .collect()
}

fn bound(coordinate: &str, value: &str) -> DiagResult<Bound> {
    let sides: Vec<Vec<FilterValue>> = value
        .split(RANGE_SEPARATOR)
        .map(|side| side.split(',').map(parse_filter_value).collect())
        .collect();

    let width = sides[0].len();
    if sides.iter().any(|side| side.len() != width) {
        return Err(DiagError::filter(
            coordinate,
            format!("every side of '{}' must have the same number of values", value),
        ));
    }

    let mut lower = Vec::with_capacity(width);
    let mut upper = Vec::with_capacity(width);
    for column in 0..width {
        let (lo, hi) = extent(sides.iter().map(|side| &side[column]))
            .ok_or_else(|| DiagError::filter(coordinate, format!("cannot compare the values in '{}'", value)))?;
        lower.push(lo);
        upper.push(hi);
    }

    Ok(Bound {
        coordinate: coordinate.to_string(),
        lower,
        upper,
    })
}

/// Minimum and maximum of one column. Numbers compare numerically and text
/// lexically; a column mixing the two has no extent.
fn extent<'a>(mut values: impl Iterator<Item = &'a FilterValue>) -> Option<(FilterValue, FilterValue)> {
    let first = values.next()?.clone();
    values.try_fold((first.clone(), first), |(lo, hi), value| match (lo, hi, value) {
        (FilterValue::Number(lo), FilterValue::Number(hi), FilterValue::Number(v)) => {
            Some((FilterValue::Number(lo.min(*v)), FilterValue::Number(hi.max(*v))))
        }
        (FilterValue::Text(lo), FilterValue::Text(hi), FilterValue::Text(v)) => Some((
            FilterValue::Text(lo.min(v.clone())),
            FilterValue::Text(hi.max(v.clone())),
        )),
        _ => None,
    })
}

/// Keep only the observations inside every filter's bound.
///
/// Vector fields are compared component-wise and an observation is dropped if
/// any component falls outside its bound; a single-value bound applies to every
/// component. Unless a filter names `is_used`, unused observations are dropped
/// as well, and observations with a missing (NaN) value in any field are
/// always dropped. The input dataset is not modified.
pub fn apply_filters(dataset: &NormalizedDataset, filters: &[(String, String)]) -> DiagResult<NormalizedDataset> {
    let mut keep = vec![true; dataset.nobs()];

    for bound in get_bounds(filters)? {
        let column = dataset
            .column(&bound.coordinate)
            .ok_or_else(|| DiagError::UnknownCoordinate(bound.coordinate.clone()))?;
        let limits = bound.numeric()?;

        match column {
            ColumnRef::Float(values) => {
                let (lo, hi) = single(&bound, &limits)?;
                retain(&mut keep, |i| lo <= values[i] && values[i] <= hi);
            }
            ColumnRef::Bool(values) => {
                let (lo, hi) = single(&bound, &limits)?;
                retain(&mut keep, |i| {
                    let value = if values[i] { 1.0 } else { 0.0 };
                    lo <= value && value <= hi
                });
            }
            ColumnRef::Vector(columns) => {
                let limits = match limits.len() {
                    1 => vec![limits[0]; columns.len()],
                    n if n == columns.len() => limits,
                    n => {
                        return Err(DiagError::filter(
                            &bound.coordinate,
                            format!("{} bounds given for {} components", n, columns.len()),
                        ))
                    }
                };
                retain(&mut keep, |i| {
                    columns
                        .iter()
                        .zip(&limits)
                        .all(|(column, (lo, hi))| *lo <= column[i] && column[i] <= *hi)
                });
            }
        }
    }

    if !filters.iter().any(|(coordinate, _)| coordinate == IS_USED) {
        retain(&mut keep, |i| dataset.is_used[i]);
    }
    retain(&mut keep, |i| !has_missing_value(dataset, i));

    let indices: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect();
    Ok(dataset.select(&indices))
}

fn has_missing_value(dataset: &NormalizedDataset, i: usize) -> bool {
    dataset.fields().iter().any(|(_, field)| match field {
        Field::Scalar(values) => values[i].is_nan(),
        Field::Vector(columns) => columns.iter().any(|column| column[i].is_nan()),
    })
}

fn single(bound: &Bound, limits: &[(f64, f64)]) -> DiagResult<(f64, f64)> {
    match limits {
        [limit] => Ok(*limit),
        _ => Err(DiagError::filter(
            &bound.coordinate,
            format!("expected a single value per side, got {}", limits.len()),
        )),
    }
}

fn retain(keep: &mut [bool], predicate: impl Fn(usize) -> bool) {
    for (i, k) in keep.iter_mut().enumerate() {
        *k = *k && predicate(i);
    }
}
