//! In-memory run index with the same get-or-create semantics as the catalog.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use diag_common::{DiagError, DiagResult};
use storage::index::{variable_list, INIT_TIME_LIST_FORMAT};
use storage::{Analysis, ModelMetadata, RunIndex, RunKey, RunRecord, RunTransaction, WeatherModel};

#[derive(Debug, Clone, Default)]
struct State {
    models: Vec<WeatherModel>,
    analyses: Vec<Analysis>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn model(&mut self, name: &str, background_id: Option<i64>) -> WeatherModel {
        if let Some(found) = self
            .models
            .iter()
            .find(|m| m.name == name && m.background_id == background_id)
        {
            return found.clone();
        }

        let model = WeatherModel {
            id: self.next_id(),
            name: name.to_string(),
            background_id,
        };
        self.models.push(model.clone());
        model
    }

    fn analysis(&mut self, key: &RunKey, model_id: i64) -> Analysis {
        if let Some(found) = self.analyses.iter().find(|a| {
            a.time == key.time
                && a.system == key.system
                && a.frequency == key.frequency
                && a.domain == key.domain
                && a.model_id == model_id
        }) {
            return found.clone();
        }

        let analysis = Analysis {
            id: self.next_id(),
            time: key.time,
            domain: key.domain.clone(),
            frequency: key.frequency.clone(),
            system: key.system.clone(),
            model_id,
        };
        self.analyses.push(analysis.clone());
        analysis
    }

    fn upsert(&mut self, key: &RunKey) -> RunRecord {
        let background = self.model(&key.background, None);
        let model = self.model(&key.model, Some(background.id));
        let analysis = self.analysis(key, model.id);
        RunRecord {
            background,
            model,
            analysis,
        }
    }
}

/// A [`RunIndex`] held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunIndex {
    state: Arc<Mutex<State>>,
    fail_commit: Arc<AtomicBool>,
}

impl MemoryRunIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail with `CommitFailure`.
    pub fn set_fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Committed weather_model rows.
    pub fn models(&self) -> Vec<WeatherModel> {
        self.lock().models.clone()
    }

    /// Committed analysis rows.
    pub fn analyses(&self) -> Vec<Analysis> {
        self.lock().analyses.clone()
    }
}

#[async_trait]
impl RunIndex for MemoryRunIndex {
    async fn begin(&self) -> DiagResult<Box<dyn RunTransaction>> {
        Ok(Box::new(MemoryTransaction {
            working: self.lock().clone(),
            keys: Vec::new(),
            index: self.clone(),
        }))
    }

    async fn model_metadata(&self) -> DiagResult<ModelMetadata> {
        let state = self.lock();

        let sorted = |values: BTreeSet<String>| values.into_iter().collect::<Vec<_>>();
        let owners: BTreeSet<i64> = state.analyses.iter().map(|a| a.model_id).collect();
        let background_ids: BTreeSet<i64> =
            state.models.iter().filter_map(|m| m.background_id).collect();
        let times: BTreeSet<_> = state.analyses.iter().map(|a| a.time).collect();

        Ok(ModelMetadata {
            model_list: sorted(
                state
                    .models
                    .iter()
                    .filter(|m| owners.contains(&m.id))
                    .map(|m| m.name.clone())
                    .collect(),
            ),
            system_list: sorted(state.analyses.iter().map(|a| a.system.clone()).collect()),
            domain_list: sorted(state.analyses.iter().map(|a| a.domain.clone()).collect()),
            background_list: sorted(
                state
                    .models
                    .iter()
                    .filter(|m| background_ids.contains(&m.id))
                    .map(|m| m.name.clone())
                    .collect(),
            ),
            frequency_list: sorted(state.analyses.iter().map(|a| a.frequency.clone()).collect()),
            variable_list: variable_list(),
            init_time_list: times
                .iter()
                .map(|t| t.format(INIT_TIME_LIST_FORMAT).to_string())
                .collect(),
        })
    }
}

/// Upserts are applied to a private copy and replayed onto the shared state on commit.
struct MemoryTransaction {
    working: State,
    keys: Vec<RunKey>,
    index: MemoryRunIndex,
}

#[async_trait]
impl RunTransaction for MemoryTransaction {
    async fn upsert_run(&mut self, key: &RunKey) -> DiagResult<RunRecord> {
        self.keys.push(key.clone());
        Ok(self.working.upsert(key))
    }

    async fn commit(self: Box<Self>) -> DiagResult<()> {
        if self.index.fail_commit.load(Ordering::SeqCst) {
            return Err(DiagError::CommitFailure("commit rejected".to_string()));
        }

        let mut state = self.index.lock();
        for key in &self.keys {
            state.upsert(key);
        }
        Ok(())
    }
}
