//! Long-term columnar archive of diagnostics, used for time-series history.
//!
//! Layout (Hive-style partitions):
//!
//! ```text
//! {model}_{background}_{system}_{domain}_{frequency}/{variable}/loop={loop}/is_used={true|false}/{init_time}.parquet
//! ```
//!
//! Each file holds one row per observation (and component, for vectors).

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, instrument};

use diag_common::{DiagError, DiagResult, Field, NormalizedDataset, RunAttributes};

use crate::object_store::ObjectStorage;

const INIT_TIME_COLUMN: &str = "initialization_time";
const VALUE_COLUMN: &str = "obs_minus_forecast_unadjusted";

/// Directory holding every run of one variable for one lineage.
pub fn series_prefix(
    model: &str,
    background: &str,
    system: &str,
    domain: &str,
    frequency: &str,
    variable: &str,
) -> String {
    format!(
        "{}/{}",
        [model, background, system, domain, frequency].join("_"),
        variable
    )
}

fn partition_prefix(series: &str, loop_: &str, is_used: bool) -> String {
    format!("{}/loop={}/is_used={}", series, loop_, is_used)
}

fn run_file(series: &str, attrs: &RunAttributes, is_used: bool) -> String {
    format!(
        "{}/{}.parquet",
        partition_prefix(series, &attrs.loop_, is_used),
        attrs.initialization_time.replace(':', "")
    )
}

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        ArrowField::new(INIT_TIME_COLUMN, DataType::Utf8, false),
        ArrowField::new("component", DataType::Utf8, true),
        ArrowField::new("latitude", DataType::Float64, false),
        ArrowField::new("longitude", DataType::Float64, false),
        ArrowField::new("observation", DataType::Float64, true),
        ArrowField::new(VALUE_COLUMN, DataType::Float64, true),
        ArrowField::new("obs_minus_forecast_adjusted", DataType::Float64, true),
    ]))
}

/// Column builders for one partition file.
#[derive(Default)]
struct Rows {
    component: Vec<Option<String>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    observation: Vec<f64>,
    omf_unadjusted: Vec<f64>,
    omf_adjusted: Vec<f64>,
}

impl Rows {
    fn push_observation(&mut self, dataset: &NormalizedDataset, idx: usize) {
        let value = |field: &Field, c: usize| match field {
            Field::Scalar(values) => values[idx],
            Field::Vector(columns) => columns[c][idx],
        };

        let labels: Vec<Option<String>> = match &dataset.components {
            Some(labels) => labels.iter().cloned().map(Some).collect(),
            None => vec![None],
        };

        for (c, label) in labels.into_iter().enumerate() {
            self.component.push(label);
            self.latitude.push(dataset.latitude[idx]);
            self.longitude.push(dataset.longitude[idx]);
            self.observation.push(value(&dataset.observation, c));
            self.omf_unadjusted
                .push(value(&dataset.obs_minus_forecast_unadjusted, c));
            self.omf_adjusted
                .push(value(&dataset.obs_minus_forecast_adjusted, c));
        }
    }

    fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }

    fn into_batch(self, init_time: &str) -> DiagResult<RecordBatch> {
        let n = self.latitude.len();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![init_time; n])),
            Arc::new(StringArray::from(self.component)),
            Arc::new(Float64Array::from(self.latitude)),
            Arc::new(Float64Array::from(self.longitude)),
            Arc::new(Float64Array::from(self.observation)),
            Arc::new(Float64Array::from(self.omf_unadjusted)),
            Arc::new(Float64Array::from(self.omf_adjusted)),
        ];

        RecordBatch::try_new(schema(), columns)
            .map_err(|e| DiagError::StoreWriteFailure(format!("archive batch: {}", e)))
    }
}

fn encode(batch: &RecordBatch) -> DiagResult<Bytes> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
        .map_err(|e| DiagError::StoreWriteFailure(format!("parquet writer: {}", e)))?;
    writer
        .write(batch)
        .map_err(|e| DiagError::StoreWriteFailure(format!("parquet write: {}", e)))?;
    writer
        .close()
        .map_err(|e| DiagError::StoreWriteFailure(format!("parquet close: {}", e)))?;

    Ok(Bytes::from(buffer))
}

/// One archived value of a used observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedValue {
    pub initialization_time: String,
    pub obs_minus_forecast_unadjusted: f64,
}

fn decode_values(bytes: Bytes, out: &mut Vec<ArchivedValue>) -> DiagResult<()> {
    let read_err = |e: String| DiagError::StorageError(format!("parquet read: {}", e));

    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(|e| read_err(e.to_string()))?
        .build()
        .map_err(|e| read_err(e.to_string()))?;

    for batch in reader {
        let batch = batch.map_err(|e| read_err(e.to_string()))?;

        let times = batch
            .column_by_name(INIT_TIME_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| read_err(format!("missing {} column", INIT_TIME_COLUMN)))?;
        let values = batch
            .column_by_name(VALUE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
            .ok_or_else(|| read_err(format!("missing {} column", VALUE_COLUMN)))?;

        for i in 0..batch.num_rows() {
            if times.is_null(i) || values.is_null(i) {
                continue;
            }
            out.push(ArchivedValue {
                initialization_time: times.value(i).to_string(),
                obs_minus_forecast_unadjusted: values.value(i),
            });
        }
    }

    Ok(())
}

/// Parquet archive of normalized diagnostics.
#[derive(Debug, Clone)]
pub struct HistoryArchive {
    storage: ObjectStorage,
}

impl HistoryArchive {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// Write a dataset's rows into its `is_used` partitions, replacing any
    /// previous files for the same run.
    #[instrument(skip(self, dataset), fields(name = %dataset.attributes.name, loop_ = %dataset.attributes.loop_))]
    pub async fn write(&self, dataset: &NormalizedDataset) -> DiagResult<()> {
        let attrs = &dataset.attributes;
        let series = series_prefix(
            &attrs.model,
            &attrs.background,
            &attrs.system,
            &attrs.domain,
            &attrs.frequency,
            &attrs.name,
        );

        let mut used = Rows::default();
        let mut unused = Rows::default();
        for idx in 0..dataset.nobs() {
            let rows = if dataset.is_used[idx] { &mut used } else { &mut unused };
            rows.push_observation(dataset, idx);
        }

        for (is_used, rows) in [(true, used), (false, unused)] {
            let path = run_file(&series, attrs, is_used);
            if rows.is_empty() {
                self.storage.delete(&path).await?;
                continue;
            }

            let bytes = encode(&rows.into_batch(&attrs.initialization_time)?)?;
            self.storage
                .put(&path, bytes)
                .await
                .map_err(|e| DiagError::StoreWriteFailure(e.to_string()))?;
        }

        debug!(%series, "Archived dataset");
        Ok(())
    }

    /// Every archived value of used observations in a series for one loop.
    pub async fn read_used(&self, series: &str, loop_: &str) -> DiagResult<Vec<ArchivedValue>> {
        let prefix = partition_prefix(series, loop_, true);
        let mut values = Vec::new();

        for path in self.storage.list(&prefix).await? {
            if !path.ends_with(".parquet") {
                continue;
            }
            let bytes = self.storage.get(&path).await?;
            decode_values(bytes, &mut values)?;
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_prefix_order() {
        assert_eq!(
            series_prefix("RTMA", "HRRR", "WCOSS", "CONUS", "REALTIME", "t"),
            "RTMA_HRRR_WCOSS_CONUS_REALTIME/t"
        );
    }

    #[test]
    fn test_partition_paths() {
        let attrs = RunAttributes {
            name: "t".into(),
            loop_: "anl".into(),
            initialization_time: "2022-05-05T14:00".into(),
            model: "RTMA".into(),
            system: "WCOSS".into(),
            domain: "CONUS".into(),
            frequency: "REALTIME".into(),
            background: "HRRR".into(),
        };
        assert_eq!(
            run_file("RTMA_HRRR_WCOSS_CONUS_REALTIME/t", &attrs, true),
            "RTMA_HRRR_WCOSS_CONUS_REALTIME/t/loop=anl/is_used=true/2022-05-05T1400.parquet"
        );
    }
}
