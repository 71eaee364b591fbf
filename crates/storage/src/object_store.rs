//! Object storage access for raw diagnostic files and the history archive.

use std::path::Path as FsPath;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{local::LocalFileSystem, path::Path, prefix::PrefixStore, ObjectStore};
use tracing::{debug, instrument};

use diag_common::{DiagError, DiagResult};

use crate::store::{S3Credentials, StoreLocation};

/// Object storage client over a local directory or an S3 bucket.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    root: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ObjectStorage {
    /// Open a location given as a path, `file://` URI or `s3://bucket/prefix` URI.
    pub fn from_uri(uri: &str, credentials: &S3Credentials) -> DiagResult<Self> {
        let store: Arc<dyn ObjectStore> = match StoreLocation::parse(uri)? {
            StoreLocation::Local(path) => {
                std::fs::create_dir_all(&path)?;
                Arc::new(LocalFileSystem::new_with_prefix(&path).map_err(|e| {
                    DiagError::StorageError(format!("Failed to open {}: {}", path.display(), e))
                })?)
            }
            StoreLocation::S3 { bucket, prefix } if prefix.is_empty() => {
                Arc::new(credentials.build_s3(&bucket)?)
            }
            StoreLocation::S3 { bucket, prefix } => Arc::new(PrefixStore::new(
                credentials.build_s3(&bucket)?,
                prefix.as_str(),
            )),
        };

        Ok(Self {
            store,
            root: uri.to_string(),
        })
    }

    /// Open an S3 bucket.
    pub fn s3_bucket(bucket: &str, credentials: &S3Credentials) -> DiagResult<Self> {
        Ok(Self {
            store: Arc::new(credentials.build_s3(bucket)?),
            root: format!("s3://{}", bucket),
        })
    }

    /// Write bytes to a path.
    #[instrument(skip(self, data), fields(root = %self.root, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> DiagResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| DiagError::StorageError(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(root = %self.root, path = %path))]
    pub async fn get(&self, path: &str) -> DiagResult<Bytes> {
        let location = Path::from(path);

        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                DiagError::NotFound(format!("{}/{}", self.root, path))
            }
            e => DiagError::StorageError(format!("Failed to read {}: {}", path, e)),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| DiagError::StorageError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Download an object to a local file.
    pub async fn download_to(&self, path: &str, destination: &FsPath) -> DiagResult<u64> {
        let bytes = self.get(path).await?;
        tokio::fs::write(destination, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    /// List objects under a prefix. A missing prefix lists nothing.
    pub async fn list(&self, prefix: &str) -> DiagResult<Vec<String>> {
        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        loop {
            match stream.try_next().await {
                Ok(Some(meta)) => paths.push(meta.location.to_string()),
                Ok(None) => break,
                Err(object_store::Error::NotFound { .. }) => break,
                Err(e) => return Err(DiagError::StorageError(format!("List failed: {}", e))),
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Delete an object. Deleting a missing object succeeds.
    #[instrument(skip(self), fields(root = %self.root, path = %path))]
    pub async fn delete(&self, path: &str) -> DiagResult<()> {
        let location = Path::from(path);

        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(DiagError::StorageError(format!(
                "Failed to delete {}: {}",
                path, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_put_get_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            ObjectStorage::from_uri(dir.path().to_str().unwrap(), &S3Credentials::default())
                .unwrap();

        storage
            .put("a/b/one.bin", Bytes::from_static(b"one"))
            .await
            .unwrap();
        storage
            .put("a/c/two.bin", Bytes::from_static(b"two"))
            .await
            .unwrap();

        assert_eq!(storage.get("a/b/one.bin").await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(storage.list("a").await.unwrap(), vec!["a/b/one.bin", "a/c/two.bin"]);
        assert!(storage.list("missing").await.unwrap().is_empty());

        storage.delete("a/b/one.bin").await.unwrap();
        storage.delete("a/b/one.bin").await.unwrap();
        assert!(matches!(
            storage.get("a/b/one.bin").await,
            Err(DiagError::NotFound(_))
        ));
    }
}
