//! Store addressing: resolving store URIs to zarr storage backends.
//!
//! A store URI with no scheme or a `file://` scheme is a directory on the local
//! filesystem. An `s3://bucket/prefix` URI is an object-storage bucket accessed
//! through `object_store`, wrapped for the synchronous zarrs API.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::prefix::PrefixStore;
use tracing::debug;
use zarrs::storage::ReadableWritableListableStorage;
use zarrs_filesystem::FilesystemStore;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

use diag_common::{DiagError, DiagResult};

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Blocking executor that works from within a tokio runtime.
///
/// Uses `tokio::task::block_in_place` to move the current task to a blocking
/// thread, then uses the runtime handle to drive the future. Requires the
/// multi-threaded runtime.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Credentials and region for S3 access. Every credential is optional; when
/// absent the object_store default credential chain applies.
#[derive(Debug, Clone, Default)]
pub struct S3Credentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: String,
    /// Endpoint override for S3-compatible stores (MinIO).
    pub endpoint: Option<String>,
}

impl S3Credentials {
    /// Read credentials from the standard AWS environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            access_key_id: var("AWS_ACCESS_KEY_ID"),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            session_token: var("AWS_SESSION_TOKEN"),
            region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: var("AWS_ENDPOINT_URL"),
        }
    }

    /// Build an S3 client for `bucket`.
    pub fn build_s3(&self, bucket: &str) -> DiagResult<AmazonS3> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.region);

        if let Some(key) = &self.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &self.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(token) = &self.session_token {
            builder = builder.with_token(token);
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        builder
            .build()
            .map_err(|e| DiagError::StorageError(format!("Failed to create S3 client: {}", e)))
    }
}

/// Where a store URI points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Local(PathBuf),
    S3 { bucket: String, prefix: String },
}

impl StoreLocation {
    /// Classify a store URI by its scheme.
    pub fn parse(uri: &str) -> DiagResult<Self> {
        let Some((scheme, rest)) = uri.split_once("://") else {
            return Ok(StoreLocation::Local(PathBuf::from(uri)));
        };

        match scheme {
            "" | "file" => Ok(StoreLocation::Local(PathBuf::from(rest))),
            "s3" => {
                let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(DiagError::invalid_parameter(
                        "uri",
                        format!("missing bucket in '{}'", uri),
                    ));
                }
                Ok(StoreLocation::S3 {
                    bucket: bucket.to_string(),
                    prefix: prefix.trim_matches('/').to_string(),
                })
            }
            other => Err(DiagError::UnsupportedProtocol {
                scheme: other.to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}

/// A resolved array store.
#[derive(Clone)]
pub struct StoreHandle {
    location: StoreLocation,
    storage: ReadableWritableListableStorage,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn storage(&self) -> ReadableWritableListableStorage {
        self.storage.clone()
    }
}

/// Resolve a store URI, reading S3 credentials from the environment.
pub fn resolve(uri: &str) -> DiagResult<StoreHandle> {
    resolve_with(uri, &S3Credentials::from_env())
}

/// Resolve a store URI with explicit S3 credentials.
///
/// Objects are read and written without any consistency checks or locking;
/// groups are never renamed in place.
pub fn resolve_with(uri: &str, credentials: &S3Credentials) -> DiagResult<StoreHandle> {
    let location = StoreLocation::parse(uri)?;

    let storage: ReadableWritableListableStorage = match &location {
        StoreLocation::Local(path) => Arc::new(FilesystemStore::new(path).map_err(|e| {
            DiagError::StorageError(format!("Failed to open {}: {}", path.display(), e))
        })?),
        StoreLocation::S3 { bucket, prefix } => {
            let s3 = credentials.build_s3(bucket)?;
            let store = PrefixStore::new(s3, prefix.as_str());
            let async_store = Arc::new(AsyncObjectStore::new(store));
            Arc::new(AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn))
        }
    };

    debug!(uri, "Resolved array store");
    Ok(StoreHandle { location, storage })
}
