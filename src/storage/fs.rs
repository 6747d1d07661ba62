//! Filesystem implementation of the storage backend.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{GcError, GcResult};
use crate::storage::StorageBackend;

/// Stores each payload as `<root>/<id>`, either a file or a directory.
pub struct FsStorageBackend {
    root: PathBuf,
}

impl FsStorageBackend {
    /// Creates the backend, ensuring the payload root exists.
    pub async fn new(root: impl Into<PathBuf>) -> GcResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn payload_path(&self, id: &str) -> GcResult<PathBuf> {
        // Ids are opaque keys, never paths; reject anything that would
        // escape the payload root.
        if id.is_empty()
            || id == "."
            || id == ".."
            || id.contains('/')
            || id.contains('\\')
        {
            return Err(GcError::storage(format!("invalid snapshot id {id:?}")));
        }
        Ok(self.root.join(id))
    }
}

#[async_trait]
impl StorageBackend for FsStorageBackend {
    async fn delete_payload(&self, id: &str) -> GcResult<()> {
        let path = self.payload_path(id)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            // Already gone.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(GcError::storage(err)),
        };

        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(GcError::storage(format!(
                "failed to delete payload {id}: {err}"
            ))),
        }
    }

    async fn exists(&self, id: &str) -> bool {
        match self.payload_path(id) {
            Ok(path) => path.exists(),
            Err(_) => false,
        }
    }
}
