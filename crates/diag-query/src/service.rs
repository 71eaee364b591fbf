//! Query facade over the array store, history archive and run index.

use std::sync::Arc;

use tracing::{debug, instrument};

use diag_common::{DiagError, DiagResult, MinimLoop, NormalizedDataset, Variable};
use storage::{
    list_runs, open_group, series_path, series_prefix, GroupPath, HistoryArchive, ModelMetadata,
    RunIndex, StoreHandle,
};

use crate::filter::apply_filters;
use crate::history::{summarize, HistoryPoint};
use crate::observation::{observations, Observation};
use crate::records::{magnitude, records, MagnitudeRecord, Record};

/// A model lineage and variable: every level of the group hierarchy above the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub model: String,
    pub system: String,
    pub domain: String,
    pub background: String,
    pub frequency: String,
    pub variable: Variable,
}

impl Series {
    /// Path of the series group in the array store.
    pub fn group_path(&self) -> String {
        series_path(
            &self.model,
            &self.system,
            &self.domain,
            &self.background,
            &self.frequency,
            self.variable.as_str(),
        )
    }

    /// Prefix of the series in the history archive.
    pub fn archive_prefix(&self) -> String {
        series_prefix(
            &self.model,
            &self.background,
            &self.system,
            &self.domain,
            &self.frequency,
            self.variable.as_str(),
        )
    }

    /// The group of one run of this series.
    pub fn run(&self, initialization_time: &str, loop_: MinimLoop) -> GroupPath {
        GroupPath::new(
            &self.model,
            &self.system,
            &self.domain,
            &self.background,
            &self.frequency,
            self.variable.as_str(),
            initialization_time,
            loop_.as_str(),
        )
    }
}

/// Read-only access to stored diagnostics.
#[derive(Clone)]
pub struct DiagnosticService {
    store: StoreHandle,
    archive: HistoryArchive,
    index: Arc<dyn RunIndex>,
}

impl DiagnosticService {
    pub fn new(store: StoreHandle, archive: HistoryArchive, index: Arc<dyn RunIndex>) -> Self {
        Self {
            store,
            archive,
            index,
        }
    }

    /// Open one run and apply the filters to it.
    #[instrument(skip(self, filters), fields(series = %series.group_path()))]
    pub async fn filtered(
        &self,
        series: &Series,
        initialization_time: &str,
        loop_: MinimLoop,
        filters: &[(String, String)],
    ) -> DiagResult<NormalizedDataset> {
        let store = self.store.clone();
        let path = series.run(initialization_time, loop_);
        let dataset = tokio::task::spawn_blocking(move || open_group(&store, &path))
            .await
            .map_err(|e| DiagError::Internal(format!("read task failed: {}", e)))??;

        let filtered = apply_filters(&dataset, filters)?;
        debug!(nobs = dataset.nobs(), kept = filtered.nobs(), "Applied filters");
        Ok(filtered)
    }

    /// Filtered observation records.
    pub async fn records(
        &self,
        series: &Series,
        initialization_time: &str,
        loop_: MinimLoop,
        filters: &[(String, String)],
    ) -> DiagResult<Vec<Record>> {
        let dataset = self.filtered(series, initialization_time, loop_, filters).await?;
        Ok(records(&dataset))
    }

    /// Filtered observations reduced to magnitudes.
    pub async fn magnitude(
        &self,
        series: &Series,
        initialization_time: &str,
        loop_: MinimLoop,
        filters: &[(String, String)],
    ) -> DiagResult<Vec<MagnitudeRecord>> {
        let dataset = self.filtered(series, initialization_time, loop_, filters).await?;
        Ok(magnitude(&dataset))
    }

    /// Filtered observations for map display.
    pub async fn observations(
        &self,
        series: &Series,
        initialization_time: &str,
        loop_: MinimLoop,
        filters: &[(String, String)],
    ) -> DiagResult<Vec<Observation>> {
        let dataset = self.filtered(series, initialization_time, loop_, filters).await?;
        observations(&dataset)
    }

    /// Per-run summaries of used observations for one loop of a series.
    #[instrument(skip(self), fields(series = %series.archive_prefix()))]
    pub async fn history(&self, series: &Series, loop_: MinimLoop) -> DiagResult<Vec<HistoryPoint>> {
        let values = self
            .archive
            .read_used(&series.archive_prefix(), loop_.as_str())
            .await?;
        Ok(summarize(&values))
    }

    /// Initialization times stored for a series.
    pub async fn run_list(&self, series: &Series) -> DiagResult<Vec<String>> {
        let store = self.store.clone();
        let series = series.clone();
        tokio::task::spawn_blocking(move || {
            list_runs(
                &store,
                &series.model,
                &series.system,
                &series.domain,
                &series.background,
                &series.frequency,
                series.variable.as_str(),
            )
        })
        .await
        .map_err(|e| DiagError::Internal(format!("list task failed: {}", e)))?
    }

    /// Distinct lineage and run values known to the index.
    pub async fn model_metadata(&self) -> DiagResult<ModelMetadata> {
        self.index.model_metadata().await
    }
}
