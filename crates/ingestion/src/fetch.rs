//! Storage event handling: deciding whether an uploaded object is ingested and
//! fetching it to local disk.

use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use diag_common::MinimLoop;
use storage::ObjectStorage;

use crate::error::{IngestionError, Result};
use crate::metadata::parse_diag_filename;

/// Event type S3 sends when a notification configuration is created.
const TEST_EVENT: &str = "s3:TestEvent";

/// An object-created notification, reduced to what ingestion needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    /// Configuration test event; nothing to do.
    Test,
    /// A new object. The key is URL-decoded.
    Object { bucket: String, key: String },
}

impl StorageEvent {
    /// Parse an EventBridge-style event (`detail.bucket.name`, `detail.object.key`).
    pub fn from_json(event: &Value) -> Result<Self> {
        if event.get("Event").and_then(Value::as_str) == Some(TEST_EVENT) {
            return Ok(StorageEvent::Test);
        }

        let detail = event
            .get("detail")
            .ok_or_else(|| IngestionError::InvalidEvent("missing detail".to_string()))?;
        let field = |outer: &str, inner: &str| {
            detail
                .get(outer)
                .and_then(|v| v.get(inner))
                .and_then(Value::as_str)
                .ok_or_else(|| IngestionError::InvalidEvent(format!("missing detail.{}.{}", outer, inner)))
        };

        Ok(StorageEvent::Object {
            bucket: field("bucket", "name")?.to_string(),
            key: unquote_plus(field("object", "key")?),
        })
    }
}

/// What happened to one storage event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was a test event.
    Ignored,
    /// The object is not an analysis or guess diagnostic.
    Skipped { key: String },
    /// The object was fetched and saved to the given group.
    Ingested { key: String, group: String },
}

/// Decode a URL-encoded object key, treating `+` as a space.
pub fn unquote_plus(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len() => match hex_pair(bytes[i + 1], bytes[i + 2]) {
                Some(byte) => {
                    decoded.push(byte);
                    i += 2;
                }
                None => decoded.push(b'%'),
            },
            b => decoded.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let digit = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    Some(digit(hi)? * 16 + digit(lo)?)
}

/// Whether an object key names a diagnostic from the analysis or guess loop.
///
/// Path separators are read as metadata separators, so
/// `RTMA/WCOSS/CONUS/REALTIME/diag_t_anl.2022050514.nc4` carries its model,
/// system, domain and frequency in its directories.
pub fn should_ingest(key: &str) -> Result<bool> {
    let meta = parse_diag_filename(&key.replace('/', "_"))?;
    Ok(meta.loop_.parse::<MinimLoop>().is_ok())
}

/// Where fetched objects are written.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Key prefix stripped before building the local file name
    pub key_prefix: Option<String>,
    pub download_dir: PathBuf,
}

/// Local file name for an object key: when a key prefix is configured, it and
/// the `/` after it are stripped. The remaining separators become underscores.
pub fn local_name(key: &str, key_prefix: Option<&str>) -> String {
    let key = match key_prefix.filter(|prefix| !prefix.is_empty()) {
        Some(prefix) => {
            let key = key.strip_prefix(prefix).unwrap_or(key);
            key.strip_prefix('/').unwrap_or(key)
        }
        None => key,
    };
    key.replace('/', "_")
}

/// Download an object to a uniquely named local file, decompressing `.gz`
/// objects. Returns the path of the file to ingest.
#[instrument(skip(storage, config))]
pub async fn fetch_record(storage: &ObjectStorage, key: &str, config: &FetchConfig) -> Result<PathBuf> {
    let name = format!("{}-{}", Uuid::new_v4(), local_name(key, config.key_prefix.as_deref()));
    let path = config.download_dir.join(name);

    let size = storage.download_to(key, &path).await?;
    debug!(path = %path.display(), size, "Downloaded object");

    if path.extension().and_then(|ext| ext.to_str()) != Some("gz") {
        return Ok(path);
    }

    let decompressed_path = path.with_extension("");
    let compressed = tokio::fs::read(&path).await?;
    let data = decompress_gzip(&compressed)?;
    tokio::fs::write(&decompressed_path, &data).await?;
    tokio::fs::remove_file(&path).await?;
    info!(
        compressed = compressed.len(),
        decompressed = data.len(),
        path = %decompressed_path.display(),
        "Decompressed gzip object"
    );

    Ok(decompressed_path)
}

/// Decompress gzip data.
pub fn decompress_gzip(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| IngestionError::Decompression(e.to_string()))?;
    Ok(Bytes::from(decompressed))
}

/// Remove a fetched file, ignoring files that are already gone.
pub async fn remove_fetched(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
