//! Persistence of normalized datasets to the array store, history archive and
//! run index.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument};

use diag_common::{DiagError, NormalizedDataset};
use storage::{write_group, GroupPath, HistoryArchive, RunIndex, RunKey, StoreHandle};

use crate::error::Result;
use crate::normalize::load;

/// Result of saving one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Array store group the dataset was written to
    pub group: String,
    /// Id of the analysis row for the run
    pub analysis_id: i64,
    /// Id of the model row owning the analysis
    pub model_id: i64,
    /// Number of observations written
    pub nobs: usize,
}

/// Saves normalized datasets.
///
/// For each dataset the run is upserted into the index inside a transaction,
/// the dataset is written to its group in the array store (and to the history
/// archive when one is configured), and only then is the transaction committed.
/// A failed store write rolls the transaction back. A failed commit leaves the
/// store written; saving the same dataset again repairs the index.
pub struct Ingester {
    store: StoreHandle,
    index: Arc<dyn RunIndex>,
    archive: Option<HistoryArchive>,
}

impl Ingester {
    pub fn new(store: StoreHandle, index: Arc<dyn RunIndex>) -> Self {
        Self {
            store,
            index,
            archive: None,
        }
    }

    /// Also write every saved dataset to a Parquet history archive.
    pub fn with_archive(mut self, archive: HistoryArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Load a diagnostic file and save it.
    pub async fn ingest_file(&self, path: &Path) -> Result<SaveOutcome> {
        let dataset = load(path)?;
        self.save(dataset).await
    }

    /// Save several datasets in order, stopping at the first failure.
    pub async fn save_all(&self, datasets: Vec<NormalizedDataset>) -> Result<Vec<SaveOutcome>> {
        let mut outcomes = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            outcomes.push(self.save(dataset).await?);
        }
        Ok(outcomes)
    }

    /// Save one dataset.
    #[instrument(skip(self, dataset), fields(name = %dataset.attributes.name, loop_ = %dataset.attributes.loop_, init_time = %dataset.attributes.initialization_time))]
    pub async fn save(&self, dataset: NormalizedDataset) -> Result<SaveOutcome> {
        info!("Started saving dataset to Zarr and the DB");

        let key = RunKey::from_attributes(&dataset.attributes)?;
        let group = GroupPath::for_run(&dataset.attributes);

        let mut tx = self.index.begin().await?;
        let record = tx.upsert_run(&key).await?;

        let dataset = Arc::new(dataset);
        {
            let store = self.store.clone();
            let group = group.clone();
            let dataset = Arc::clone(&dataset);
            tokio::task::spawn_blocking(move || write_group(&store, &group, &dataset))
                .await
                .map_err(|e| DiagError::StoreWriteFailure(format!("write task failed: {}", e)))??;
        }

        if let Some(archive) = &self.archive {
            archive.write(&dataset).await?;
        }

        if let Err(e) = tx.commit().await {
            error!(
                group = %group,
                error = %e,
                "Relational commit failed after the array store was written; the store and index are out of sync"
            );
            return Err(e.into());
        }

        info!(group = %group, analysis_id = record.analysis.id, "Finished saving dataset to Zarr and the DB");
        Ok(SaveOutcome {
            group: group.to_string(),
            analysis_id: record.analysis.id,
            model_id: record.model.id,
            nobs: dataset.nobs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{open_group, resolve};
    use tempfile::TempDir;
    use test_utils::{scalar_dataset, wind_dataset, MemoryRunIndex};

    fn ingester(dir: &TempDir, index: &MemoryRunIndex) -> (Ingester, StoreHandle) {
        let store = resolve(dir.path().to_str().unwrap()).unwrap();
        (Ingester::new(store.clone(), Arc::new(index.clone())), store)
    }

    #[tokio::test]
    async fn test_save_writes_group_and_index() {
        let dir = TempDir::new().unwrap();
        let index = MemoryRunIndex::new();
        let (ingester, store) = ingester(&dir, &index);

        let dataset = scalar_dataset();
        let outcome = ingester.save(dataset.clone()).await.unwrap();

        assert_eq!(
            outcome.group,
            "RTMA/WCOSS/CONUS/HRRR/REALTIME/t/2022-05-05T14:00/anl"
        );
        assert_eq!(outcome.nobs, 3);
        assert_eq!(index.analyses().len(), 1);
        // background and model
        assert_eq!(index.models().len(), 2);

        let reopened = open_group(&store, &GroupPath::for_run(&dataset.attributes)).unwrap();
        assert_eq!(reopened, dataset);
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let index = MemoryRunIndex::new();
        let (ingester, _store) = ingester(&dir, &index);

        let first = ingester.save(scalar_dataset()).await.unwrap();
        let second = ingester.save(scalar_dataset()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(index.analyses().len(), 1);
        assert_eq!(index.models().len(), 2);
    }

    #[tokio::test]
    async fn test_runs_share_lineage() {
        let dir = TempDir::new().unwrap();
        let index = MemoryRunIndex::new();
        let (ingester, _store) = ingester(&dir, &index);

        let outcomes = ingester
            .save_all(vec![scalar_dataset(), wind_dataset()])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        // same model, background and run
        assert_eq!(outcomes[0].analysis_id, outcomes[1].analysis_id);
        assert_eq!(index.models().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_store_written() {
        let dir = TempDir::new().unwrap();
        let index = MemoryRunIndex::new();
        index.set_fail_commit(true);
        let (ingester, store) = ingester(&dir, &index);

        let dataset = scalar_dataset();
        let err = ingester.save(dataset.clone()).await.unwrap_err();

        assert!(matches!(err.as_diag(), Some(DiagError::CommitFailure(_))));
        assert!(index.analyses().is_empty());
        assert!(open_group(&store, &GroupPath::for_run(&dataset.attributes)).is_ok());

        // a retry repairs the index
        index.set_fail_commit(false);
        ingester.save(dataset).await.unwrap();
        assert_eq!(index.analyses().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_rolls_back_index() {
        let dir = TempDir::new().unwrap();
        // a regular file where the model group should be
        std::fs::write(dir.path().join("RTMA"), b"not a group").unwrap();
        let index = MemoryRunIndex::new();
        let (ingester, _store) = ingester(&dir, &index);

        let err = ingester.save(scalar_dataset()).await.unwrap_err();

        assert!(matches!(err.as_diag(), Some(DiagError::GroupPathConflict(_))));
        assert!(index.analyses().is_empty());
        assert!(index.models().is_empty());
    }
}
