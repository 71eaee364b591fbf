//! Zarr group layout for normalized diagnostics.
//!
//! Every dataset lives in a leaf group addressed by
//! `model/system/domain/background/frequency/variable/initialization_time/loop`.
//! The leaf holds `latitude`, `longitude`, `is_used` and the five value arrays;
//! the run attributes (and component labels for vectors) are group attributes.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::{
    ListableStorageTraits, ReadableStorageTraits, ReadableWritableListableStorage,
    ReadableWritableListableStorageTraits, StoreKey, StorePrefix, WritableStorageTraits,
};

use diag_common::{DiagError, DiagResult, Field, NormalizedDataset, RunAttributes, FIELD_NAMES};

use crate::store::{StoreHandle, StoreLocation};

const METADATA_KEY: &str = "zarr.json";
const OBS_DIMENSION: &str = "nobs";
const COMPONENT_DIMENSION: &str = "component";

/// The 8-level address of one variable of one run in the array store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupPath {
    segments: [String; 8],
}

impl GroupPath {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: &str,
        system: &str,
        domain: &str,
        background: &str,
        frequency: &str,
        variable: &str,
        initialization_time: &str,
        loop_: &str,
    ) -> Self {
        Self {
            segments: [
                model,
                system,
                domain,
                background,
                frequency,
                variable,
                initialization_time,
                loop_,
            ]
            .map(str::to_string),
        }
    }

    /// The group a dataset with these attributes is written to.
    pub fn for_run(attrs: &RunAttributes) -> Self {
        Self::new(
            &attrs.model,
            &attrs.system,
            &attrs.domain,
            &attrs.background,
            &attrs.frequency,
            &attrs.name,
            &attrs.initialization_time,
            &attrs.loop_,
        )
    }

    pub fn segments(&self) -> &[String; 8] {
        &self.segments
    }

    /// Paths of every ancestor group, shortest first, excluding the root.
    fn ancestors(&self) -> impl Iterator<Item = String> + '_ {
        (1..self.segments.len()).map(|depth| self.segments[..depth].join("/"))
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// The series level of the hierarchy: every run of one variable for one lineage.
pub fn series_path(
    model: &str,
    system: &str,
    domain: &str,
    background: &str,
    frequency: &str,
    variable: &str,
) -> String {
    [model, system, domain, background, frequency, variable].join("/")
}

fn metadata_key(path: &str) -> DiagResult<StoreKey> {
    let key = if path.is_empty() {
        METADATA_KEY.to_string()
    } else {
        format!("{}/{}", path, METADATA_KEY)
    };
    StoreKey::new(key).map_err(|e| DiagError::StorageError(e.to_string()))
}

fn node_path(path: &str) -> String {
    format!("/{}", path)
}

#[derive(Debug, PartialEq, Eq)]
enum NodeKind {
    Missing,
    Group(serde_json::Map<String, serde_json::Value>),
    Array,
}

fn read_node(storage: &ReadableWritableListableStorage, path: &str) -> DiagResult<NodeKind> {
    let bytes = storage
        .get(&metadata_key(path)?)
        .map_err(|e| DiagError::StorageError(format!("Failed to read {}: {}", path, e)))?;

    let Some(bytes) = bytes else {
        return Ok(NodeKind::Missing);
    };

    let metadata: serde_json::Value = serde_json::from_slice(&bytes)?;
    match metadata.get("node_type").and_then(|v| v.as_str()) {
        Some("group") => Ok(NodeKind::Group(
            metadata
                .get("attributes")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default(),
        )),
        _ => Ok(NodeKind::Array),
    }
}

/// Whether some prefix of `path` exists on the local filesystem as a regular file.
fn blocked_by_file(store: &StoreHandle, path: &str) -> bool {
    let StoreLocation::Local(root) = store.location() else {
        return false;
    };

    let mut current = root.clone();
    for segment in path.split('/') {
        current.push(segment);
        if current.is_file() {
            return true;
        }
    }
    false
}

fn create_group(
    storage: &ReadableWritableListableStorage,
    path: &str,
    attributes: serde_json::Map<String, serde_json::Value>,
) -> DiagResult<()> {
    GroupBuilder::new()
        .attributes(attributes)
        .build(storage.clone(), &node_path(path))
        .map_err(|e| DiagError::StoreWriteFailure(format!("group {}: {}", path, e)))?
        .store_metadata()
        .map_err(|e| DiagError::StoreWriteFailure(format!("group {}: {}", path, e)))
}

fn dimension_attributes(dims: &[&str]) -> serde_json::Map<String, serde_json::Value> {
    let mut attrs = serde_json::Map::new();
    attrs.insert("_ARRAY_DIMENSIONS".to_string(), serde_json::json!(dims));
    attrs
}

fn write_array<T: zarrs::array::Element>(
    storage: &ReadableWritableListableStorage,
    path: &str,
    shape: Vec<u64>,
    data_type: DataType,
    fill_value: FillValue,
    dims: &[&str],
    data: &[T],
) -> DiagResult<()> {
    let write_err = |e: String| DiagError::StoreWriteFailure(format!("array {}: {}", path, e));

    // A single chunk spans the whole array; chunk extents must be non-zero.
    let chunk_shape: Vec<u64> = shape.iter().map(|&n| n.max(1)).collect();
    let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
        .try_into()
        .map_err(|e| write_err(format!("{:?}", e)))?;

    let mut binding = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value);
    let builder = binding.attributes(dimension_attributes(dims));
    let array = builder
        .build(storage.clone(), &node_path(path))
        .map_err(|e| write_err(e.to_string()))?;

    array
        .store_metadata()
        .map_err(|e| write_err(e.to_string()))?;

    if data.is_empty() {
        return Ok(());
    }

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
        .map_err(|e| write_err(e.to_string()))?;
    array
        .store_array_subset_elements::<T>(&subset, data)
        .map_err(|e| write_err(e.to_string()))
}

/// Interleave component columns into row-major `[nobs, component]` order.
fn to_row_major(columns: &[Vec<f64>]) -> Vec<f64> {
    let nobs = columns.first().map(Vec::len).unwrap_or(0);
    (0..nobs)
        .flat_map(|i| columns.iter().map(move |c| c[i]))
        .collect()
}

fn from_row_major(data: &[f64], components: usize) -> Vec<Vec<f64>> {
    (0..components)
        .map(|c| data.iter().skip(c).step_by(components).copied().collect())
        .collect()
}

fn write_field(
    storage: &ReadableWritableListableStorage,
    path: &str,
    nobs: usize,
    field: &Field,
) -> DiagResult<()> {
    match field {
        Field::Scalar(values) => write_array(
            storage,
            path,
            vec![nobs as u64],
            DataType::Float64,
            FillValue::from(f64::NAN),
            &[OBS_DIMENSION],
            values,
        ),
        Field::Vector(columns) => write_array(
            storage,
            path,
            vec![nobs as u64, columns.len() as u64],
            DataType::Float64,
            FillValue::from(f64::NAN),
            &[OBS_DIMENSION, COMPONENT_DIMENSION],
            &to_row_major(columns),
        ),
    }
}

/// Write a dataset into its group in append/merge mode.
///
/// Missing ancestor groups are created and existing ones are left untouched.
/// The leaf group is erased and rewritten, so repeating a write with the same
/// content leaves the store unchanged.
#[instrument(skip(store, dataset), fields(group = %path, nobs = dataset.nobs()))]
pub fn write_group(store: &StoreHandle, path: &GroupPath, dataset: &NormalizedDataset) -> DiagResult<()> {
    let storage = store.storage();
    let leaf = path.to_string();

    if blocked_by_file(store, &leaf) {
        return Err(DiagError::GroupPathConflict(leaf));
    }

    for ancestor in std::iter::once(String::new()).chain(path.ancestors()) {
        match read_node(&storage, &ancestor)? {
            NodeKind::Missing => create_group(&storage, &ancestor, serde_json::Map::new())?,
            NodeKind::Group(_) => {}
            NodeKind::Array => return Err(DiagError::GroupPathConflict(ancestor)),
        }
    }

    if read_node(&storage, &leaf)? == NodeKind::Array {
        return Err(DiagError::GroupPathConflict(leaf));
    }

    let prefix = StorePrefix::new(format!("{}/", leaf))
        .map_err(|e| DiagError::StoreWriteFailure(e.to_string()))?;
    storage
        .erase_prefix(&prefix)
        .map_err(|e| DiagError::StoreWriteFailure(format!("erase {}: {}", leaf, e)))?;

    create_group(&storage, &leaf, dataset.group_attributes().into_iter().collect())?;

    let nobs = dataset.nobs();
    let coord = |name: &str| format!("{}/{}", leaf, name);
    write_array(
        &storage,
        &coord("latitude"),
        vec![nobs as u64],
        DataType::Float64,
        FillValue::from(f64::NAN),
        &[OBS_DIMENSION],
        &dataset.latitude,
    )?;
    write_array(
        &storage,
        &coord("longitude"),
        vec![nobs as u64],
        DataType::Float64,
        FillValue::from(f64::NAN),
        &[OBS_DIMENSION],
        &dataset.longitude,
    )?;
    write_array(
        &storage,
        &coord("is_used"),
        vec![nobs as u64],
        DataType::Bool,
        FillValue::from(false),
        &[OBS_DIMENSION],
        &dataset.is_used,
    )?;

    for (name, field) in dataset.fields() {
        write_field(&storage, &coord(name), nobs, field)?;
    }

    debug!("Wrote diagnostic group");
    Ok(())
}

fn read_array<T: zarrs::array::ElementOwned>(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> DiagResult<(Vec<u64>, Vec<T>)> {
    let read_err = |e: String| DiagError::StorageError(format!("array {}: {}", path, e));

    let array = Array::<dyn ReadableWritableListableStorageTraits>::open(
        Arc::clone(storage),
        &node_path(path),
    )
    .map_err(|e| match read_node(storage, path) {
        Ok(NodeKind::Missing) => DiagError::MissingField(path.to_string()),
        _ => read_err(e.to_string()),
    })?;

    let shape = array.shape().to_vec();
    if shape.iter().any(|&n| n == 0) {
        return Ok((shape, Vec::new()));
    }

    let data = array
        .retrieve_array_subset_elements::<T>(&ArraySubset::new_with_shape(shape.clone()))
        .map_err(|e| read_err(e.to_string()))?;
    Ok((shape, data))
}

/// Open the group for one variable of one run.
///
/// Fails with `GroupNotFound` if nothing exists at the path, and with
/// `GroupPathConflict` if the path exists but is not a group.
#[instrument(skip(store), fields(group = %path))]
pub fn open_group(store: &StoreHandle, path: &GroupPath) -> DiagResult<NormalizedDataset> {
    let storage = store.storage();
    let leaf = path.to_string();

    if blocked_by_file(store, &leaf) {
        return Err(DiagError::GroupPathConflict(leaf));
    }

    let attrs = match read_node(&storage, &leaf)? {
        NodeKind::Group(attrs) => attrs,
        NodeKind::Array => return Err(DiagError::GroupPathConflict(leaf)),
        NodeKind::Missing => return Err(DiagError::GroupNotFound(leaf)),
    };

    let components: Option<Vec<String>> = match attrs.get("component") {
        Some(value) => Some(serde_json::from_value(value.clone())?),
        None => None,
    };
    let attributes = RunAttributes::from_json_map(&attrs)?;

    let coord = |name: &str| format!("{}/{}", leaf, name);
    let (_, latitude) = read_array::<f64>(&storage, &coord("latitude"))?;
    let (_, longitude) = read_array::<f64>(&storage, &coord("longitude"))?;
    let (_, is_used) = read_array::<bool>(&storage, &coord("is_used"))?;

    let mut fields = Vec::with_capacity(FIELD_NAMES.len());
    for name in FIELD_NAMES {
        let (shape, data) = read_array::<f64>(&storage, &coord(name))?;
        let field = match (&components, shape.as_slice()) {
            (None, [_]) => Field::Scalar(data),
            (Some(labels), [_, n]) if *n as usize == labels.len() => {
                Field::Vector(from_row_major(&data, labels.len()))
            }
            _ => {
                return Err(DiagError::ShapeMismatch(format!(
                    "{} has shape {:?}",
                    coord(name),
                    shape
                )))
            }
        };
        fields.push(field);
    }

    let fields: [Field; 5] = fields
        .try_into()
        .map_err(|_| DiagError::Internal("expected five value arrays".to_string()))?;

    NormalizedDataset::try_new(latitude, longitude, is_used, components, fields, attributes)
}

/// Initialization times stored for one variable of one lineage, sorted.
pub fn list_runs(
    store: &StoreHandle,
    model: &str,
    system: &str,
    domain: &str,
    background: &str,
    frequency: &str,
    variable: &str,
) -> DiagResult<Vec<String>> {
    list_child_groups(
        store,
        &series_path(model, system, domain, background, frequency, variable),
    )
}

/// List the child groups stored under a group path, sorted.
pub fn list_child_groups(store: &StoreHandle, path: &str) -> DiagResult<Vec<String>> {
    let storage = store.storage();

    if blocked_by_file(store, path) {
        return Err(DiagError::GroupPathConflict(path.to_string()));
    }

    match read_node(&storage, path)? {
        NodeKind::Group(_) => {}
        NodeKind::Array => return Err(DiagError::GroupPathConflict(path.to_string())),
        NodeKind::Missing => return Err(DiagError::GroupNotFound(path.to_string())),
    }

    let prefix = StorePrefix::new(format!("{}/", path))
        .map_err(|e| DiagError::StorageError(e.to_string()))?;
    let listing = storage
        .list_dir(&prefix)
        .map_err(|e| DiagError::StorageError(format!("Failed to list {}: {}", path, e)))?;

    let mut children = Vec::new();
    for child in listing.prefixes() {
        let child_path = child.as_str().trim_end_matches('/');
        if let NodeKind::Group(_) = read_node(&storage, child_path)? {
            if let Some(name) = child_path.rsplit('/').next() {
                children.push(name.to_string());
            }
        }
    }

    children.sort();
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_path_order() {
        let path = GroupPath::new(
            "RTMA", "WCOSS", "CONUS", "HRRR", "REALTIME", "uv", "2022-05-05T14:00", "ges",
        );
        assert_eq!(
            path.to_string(),
            "RTMA/WCOSS/CONUS/HRRR/REALTIME/uv/2022-05-05T14:00/ges"
        );
        let ancestors: Vec<String> = path.ancestors().collect();
        assert_eq!(ancestors.len(), 7);
        assert_eq!(ancestors[0], "RTMA");
        assert_eq!(ancestors[6], "RTMA/WCOSS/CONUS/HRRR/REALTIME/uv/2022-05-05T14:00");
    }

    #[test]
    fn test_series_path_matches_group_prefix() {
        let path = GroupPath::new("m", "s", "d", "b", "f", "t", "2022-01-01T00:00", "anl");
        assert!(path
            .to_string()
            .starts_with(&series_path("m", "s", "d", "b", "f", "t")));
    }

    #[test]
    fn test_row_major_layout() {
        let columns = vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]];
        let data = to_row_major(&columns);
        assert_eq!(data, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
        assert_eq!(from_row_major(&data, 2), columns);
    }
}
