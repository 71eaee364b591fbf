//! The relational run index: model lineages and analysis runs.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use diag_common::{DiagResult, RunAttributes, Variable};

/// A named model, optionally anchored to a background model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherModel {
    pub id: i64,
    pub name: String,
    pub background_id: Option<i64>,
}

/// One model run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: i64,
    pub time: NaiveDateTime,
    pub domain: String,
    pub frequency: String,
    pub system: String,
    pub model_id: i64,
}

/// The lineage and run identity of a dataset, as recorded in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub background: String,
    pub model: String,
    pub time: NaiveDateTime,
    pub system: String,
    pub domain: String,
    pub frequency: String,
}

impl RunKey {
    pub fn from_attributes(attrs: &RunAttributes) -> DiagResult<Self> {
        Ok(Self {
            background: attrs.background.clone(),
            model: attrs.model.clone(),
            time: attrs.init_time()?,
            system: attrs.system.clone(),
            domain: attrs.domain.clone(),
            frequency: attrs.frequency.clone(),
        })
    }
}

/// Rows found or created for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub background: WeatherModel,
    pub model: WeatherModel,
    pub analysis: Analysis,
}

/// Distinct values available for building queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_list: Vec<String>,
    pub system_list: Vec<String>,
    pub domain_list: Vec<String>,
    pub background_list: Vec<String>,
    pub frequency_list: Vec<String>,
    pub variable_list: Vec<String>,
    pub init_time_list: Vec<String>,
}

/// Variable codes offered to clients.
pub fn variable_list() -> Vec<String> {
    Variable::ALL.iter().map(|v| v.as_str().to_string()).collect()
}

/// Format used for initialization times in listings (minute precision).
pub const INIT_TIME_LIST_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A relational index of model lineages and runs.
#[async_trait]
pub trait RunIndex: Send + Sync {
    /// Start a unit of work.
    async fn begin(&self) -> DiagResult<Box<dyn RunTransaction>>;

    /// Distinct models, systems, domains, backgrounds, frequencies and init times.
    async fn model_metadata(&self) -> DiagResult<ModelMetadata>;
}

/// A unit of work against a [`RunIndex`].
#[async_trait]
pub trait RunTransaction: Send {
    /// Find or create the background, model and analysis rows for a run.
    /// Existing rows are never modified.
    async fn upsert_run(&mut self, key: &RunKey) -> DiagResult<RunRecord>;

    /// Make the upserted rows visible. Dropping without committing discards them.
    async fn commit(self: Box<Self>) -> DiagResult<()>;
}
