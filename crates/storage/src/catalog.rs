//! Run index backed by PostgreSQL.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use diag_common::{DiagError, DiagResult};

use crate::index::{
    variable_list, Analysis, ModelMetadata, RunIndex, RunKey, RunRecord, RunTransaction,
    WeatherModel, INIT_TIME_LIST_FORMAT,
};

/// Database connection pool and catalog operations.
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    /// Create a new catalog connection from database URL.
    pub async fn connect(database_url: &str) -> DiagResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| DiagError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create the schema if it does not exist.
    pub async fn migrate(&self) -> DiagResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| DiagError::DatabaseError(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn distinct_strings(&self, sql: &str) -> DiagResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DiagError::DatabaseError(format!("Query failed: {}", e)))
    }
}

#[async_trait]
impl RunIndex for Catalog {
    async fn begin(&self) -> DiagResult<Box<dyn RunTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DiagError::DatabaseError(format!("Begin failed: {}", e)))?;
        Ok(Box::new(CatalogTransaction { tx }))
    }

    #[instrument(skip(self))]
    async fn model_metadata(&self) -> DiagResult<ModelMetadata> {
        let init_times: Vec<NaiveDateTime> =
            sqlx::query_scalar("SELECT DISTINCT time FROM analysis ORDER BY time")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiagError::DatabaseError(format!("Query failed: {}", e)))?;

        Ok(ModelMetadata {
            model_list: self
                .distinct_strings(
                    "SELECT DISTINCT wm.name FROM weather_model wm \
                     WHERE EXISTS (SELECT 1 FROM analysis a WHERE a.model_id = wm.id) \
                     ORDER BY wm.name",
                )
                .await?,
            system_list: self
                .distinct_strings("SELECT DISTINCT system FROM analysis ORDER BY system")
                .await?,
            domain_list: self
                .distinct_strings("SELECT DISTINCT domain FROM analysis ORDER BY domain")
                .await?,
            background_list: self
                .distinct_strings(
                    "SELECT DISTINCT wm.name FROM weather_model wm \
                     JOIN (SELECT DISTINCT background_id FROM weather_model \
                           WHERE background_id IS NOT NULL) bg \
                     ON bg.background_id = wm.id \
                     ORDER BY wm.name",
                )
                .await?,
            frequency_list: self
                .distinct_strings("SELECT DISTINCT frequency FROM analysis ORDER BY frequency")
                .await?,
            variable_list: variable_list(),
            init_time_list: init_times
                .iter()
                .map(|t| t.format(INIT_TIME_LIST_FORMAT).to_string())
                .collect(),
        })
    }
}

/// An open transaction on the catalog.
///
/// Each row is inserted with `ON CONFLICT DO NOTHING` and then read back, so
/// concurrent writers for the same lineage converge on the same rows.
pub struct CatalogTransaction {
    tx: Transaction<'static, Postgres>,
}

impl CatalogTransaction {
    async fn root_model(&mut self, name: &str) -> DiagResult<WeatherModel> {
        sqlx::query(
            "INSERT INTO weather_model (name, background_id) VALUES ($1, NULL) \
             ON CONFLICT (name) WHERE background_id IS NULL DO NOTHING",
        )
        .bind(name)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DiagError::DatabaseError(format!("Insert model failed: {}", e)))?;

        sqlx::query_as::<_, WeatherModelRow>(
            "SELECT id, name, background_id FROM weather_model \
             WHERE name = $1 AND background_id IS NULL",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map(Into::into)
        .map_err(|e| DiagError::DatabaseError(format!("Lookup model failed: {}", e)))
    }

    async fn child_model(&mut self, name: &str, background_id: i64) -> DiagResult<WeatherModel> {
        sqlx::query(
            "INSERT INTO weather_model (name, background_id) VALUES ($1, $2) \
             ON CONFLICT (name, background_id) DO NOTHING",
        )
        .bind(name)
        .bind(background_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DiagError::DatabaseError(format!("Insert model failed: {}", e)))?;

        sqlx::query_as::<_, WeatherModelRow>(
            "SELECT id, name, background_id FROM weather_model \
             WHERE name = $1 AND background_id = $2",
        )
        .bind(name)
        .bind(background_id)
        .fetch_one(&mut *self.tx)
        .await
        .map(Into::into)
        .map_err(|e| DiagError::DatabaseError(format!("Lookup model failed: {}", e)))
    }

    async fn analysis(&mut self, key: &RunKey, model_id: i64) -> DiagResult<Analysis> {
        sqlx::query(
            "INSERT INTO analysis (time, system, frequency, domain, model_id) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT analysis_run_key DO NOTHING",
        )
        .bind(key.time)
        .bind(&key.system)
        .bind(&key.frequency)
        .bind(&key.domain)
        .bind(model_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DiagError::DatabaseError(format!("Insert analysis failed: {}", e)))?;

        sqlx::query_as::<_, AnalysisRow>(
            "SELECT id, time, domain, frequency, system, model_id FROM analysis \
             WHERE time = $1 AND system = $2 AND frequency = $3 AND domain = $4 \
             AND model_id = $5",
        )
        .bind(key.time)
        .bind(&key.system)
        .bind(&key.frequency)
        .bind(&key.domain)
        .bind(model_id)
        .fetch_one(&mut *self.tx)
        .await
        .map(Into::into)
        .map_err(|e| DiagError::DatabaseError(format!("Lookup analysis failed: {}", e)))
    }
}

#[async_trait]
impl RunTransaction for CatalogTransaction {
    #[instrument(skip(self), fields(model = %key.model, background = %key.background))]
    async fn upsert_run(&mut self, key: &RunKey) -> DiagResult<RunRecord> {
        let background = self.root_model(&key.background).await?;
        let model = self.child_model(&key.model, background.id).await?;
        let analysis = self.analysis(key, model.id).await?;

        debug!(analysis_id = analysis.id, model_id = model.id, "Upserted run");
        Ok(RunRecord {
            background,
            model,
            analysis,
        })
    }

    async fn commit(self: Box<Self>) -> DiagResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DiagError::CommitFailure(e.to_string()))
    }
}

/// Database row for weather_model.
#[derive(Debug, FromRow)]
struct WeatherModelRow {
    id: i64,
    name: String,
    background_id: Option<i64>,
}

impl From<WeatherModelRow> for WeatherModel {
    fn from(row: WeatherModelRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            background_id: row.background_id,
        }
    }
}

/// Database row for analysis.
#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: i64,
    time: NaiveDateTime,
    domain: String,
    frequency: String,
    system: String,
    model_id: i64,
}

impl From<AnalysisRow> for Analysis {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            time: row.time,
            domain: row.domain,
            frequency: row.frequency,
            system: row.system,
            model_id: row.model_id,
        }
    }
}

/// Database schema.
///
/// Root models (no background) are unique by name through a partial index,
/// because `UNIQUE (name, background_id)` does not constrain NULLs.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS weather_model (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(24) NOT NULL,
    background_id BIGINT REFERENCES weather_model(id),
    CONSTRAINT weather_model_name_background_key UNIQUE (name, background_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS weather_model_root_name_key
    ON weather_model (name) WHERE background_id IS NULL;

CREATE TABLE IF NOT EXISTS analysis (
    id BIGSERIAL PRIMARY KEY,
    time TIMESTAMP NOT NULL,
    domain VARCHAR(24) NOT NULL,
    frequency VARCHAR(24) NOT NULL,
    system VARCHAR(24) NOT NULL,
    model_id BIGINT NOT NULL REFERENCES weather_model(id),
    CONSTRAINT analysis_run_key UNIQUE (time, system, frequency, domain, model_id)
);

CREATE INDEX IF NOT EXISTS idx_analysis_model_id ON analysis (model_id);
"#;
