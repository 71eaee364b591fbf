//! HTTP server for the ingester service.
//!
//! Provides endpoints for:
//! - `POST /ingest` - Handle a storage event
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use diag_common::DiagResult;
use ingestion::{
    fetch_record, remove_fetched, should_ingest, EventOutcome, FetchConfig, Ingester, IngestionError,
    StorageEvent,
};
use storage::{ObjectStorage, S3Credentials};

/// Where event objects are read from.
pub enum ObjectSource {
    /// The bucket named by each event, over S3.
    Buckets(S3Credentials),
    /// One fixed store, whatever bucket the event names.
    Fixed(ObjectStorage),
}

impl ObjectSource {
    fn storage_for(&self, bucket: &str) -> DiagResult<ObjectStorage> {
        match self {
            ObjectSource::Buckets(credentials) => ObjectStorage::s3_bucket(bucket, credentials),
            ObjectSource::Fixed(storage) => Ok(storage.clone()),
        }
    }
}

/// Shared state for the HTTP server.
pub struct ServerState {
    pub ingester: Ingester,
    pub source: ObjectSource,
    pub fetch: FetchConfig,
}

/// Response body for /ingest endpoint.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// `ingested`, `skipped`, `ignored` or `failed`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IngestResponse {
    fn status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            key: None,
            group: None,
            message: None,
        }
    }
}

impl From<EventOutcome> for IngestResponse {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Ignored => Self::status("ignored"),
            EventOutcome::Skipped { key } => Self {
                key: Some(key),
                ..Self::status("skipped")
            },
            EventOutcome::Ingested { key, group } => Self {
                key: Some(key),
                group: Some(group),
                ..Self::status("ingested")
            },
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Handle one storage event: fetch the object it names, then load and save it.
///
/// Test events and events without a bucket and key are ignored. Diagnostics
/// from intermediate minimization loops are skipped. The fetched file is
/// removed whether or not the save succeeds.
pub async fn process_event(state: &ServerState, event: &Value) -> ingestion::Result<EventOutcome> {
    let (bucket, key) = match StorageEvent::from_json(event) {
        Ok(StorageEvent::Object { bucket, key }) => (bucket, key),
        Ok(StorageEvent::Test) => {
            info!("Ignoring storage test event");
            return Ok(EventOutcome::Ignored);
        }
        Err(e) => {
            warn!(error = %e, "Ignoring storage event");
            return Ok(EventOutcome::Ignored);
        }
    };

    if !should_ingest(&key)? {
        info!(key = %key, "Skipping diagnostic from an intermediate loop");
        return Ok(EventOutcome::Skipped { key });
    }

    let storage = state.source.storage_for(&bucket)?;
    let path = fetch_record(&storage, &key, &state.fetch).await?;
    let saved = state.ingester.ingest_file(&path).await;
    remove_fetched(&path).await?;
    let outcome = saved?;

    info!(key = %key, group = %outcome.group, nobs = outcome.nobs, "Ingested diagnostic");
    Ok(EventOutcome::Ingested {
        key,
        group: outcome.group,
    })
}

fn status_code(err: &IngestionError) -> StatusCode {
    err.as_diag()
        .and_then(|e| StatusCode::from_u16(e.http_status_code()).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// POST /ingest - Handle a storage event
async fn ingest_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Json(event): Json<Value>,
) -> impl IntoResponse {
    match process_event(&state, &event).await {
        Ok(outcome) => (StatusCode::OK, Json(IngestResponse::from(outcome))),
        Err(e) => {
            error!(error = %e, "Ingestion failed");
            let response = IngestResponse {
                message: Some(format!("Ingestion failed: {}", e)),
                ..IngestResponse::status("failed")
            };
            (status_code(&e), Json(response))
        }
    }
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "ingester".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/ingest", post(ingest_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag_common::DiagError;

    #[test]
    fn test_response_from_outcome() {
        let response = IngestResponse::from(EventOutcome::Skipped {
            key: "diag_t_01.2022050514.nc4".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["key"], "diag_t_01.2022050514.nc4");
        assert!(json.get("group").is_none());

        let json = serde_json::to_value(IngestResponse::from(EventOutcome::Ignored)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ignored" }));
    }

    #[test]
    fn test_status_codes() {
        let bad_name = IngestionError::Diag(DiagError::InvalidFilename("x.nc4".into()));
        assert_eq!(status_code(&bad_name), StatusCode::BAD_REQUEST);

        let commit = IngestionError::Diag(DiagError::CommitFailure("lost".into()));
        assert_eq!(status_code(&commit), StatusCode::INTERNAL_SERVER_ERROR);

        let gzip = IngestionError::Decompression("truncated".into());
        assert_eq!(status_code(&gzip), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
