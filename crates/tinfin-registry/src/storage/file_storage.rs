//! Local directory implementation of [`BlobStorage`]
//!
//! Directory structure:
//! ```text
//! base_path/
//! ├── blobs/
//! │   └── sha256/
//! │       └── <hex digest>
//! └── refs/
//!     └── <resource name>
//! ```

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::blob_storage::{BlobStorage, StorageError, validate_key};

pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    /// Create a storage rooted at `base_path`, creating the directory if needed
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Backend(format!(
                "Failed to create {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment)))
    }
}

fn backend_error(key: &str, err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Backend(format!("{}: {}", key, err)),
    }
}

#[async_trait]
impl BlobStorage for FileSystemStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| backend_error(key, e))?;
        }

        // Write-then-rename so readers never observe a partial payload
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).await.map_err(|e| backend_error(key, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| backend_error(key, e))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| backend_error(key, e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| backend_error(key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend_error(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_filesystem_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path()).await.unwrap();

        storage
            .put("blobs/sha256/abc", b"{\"name\":\"auth-1\"}".to_vec())
            .await
            .unwrap();

        assert!(dir.path().join("blobs").join("sha256").join("abc").exists());
        assert!(storage.exists("blobs/sha256/abc").await.unwrap());
        assert_eq!(
            storage.get("blobs/sha256/abc").await.unwrap(),
            b"{\"name\":\"auth-1\"}".to_vec()
        );

        storage.delete("blobs/sha256/abc").await.unwrap();
        storage.delete("blobs/sha256/abc").await.unwrap();
        assert!(matches!(
            storage.get("blobs/sha256/abc").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_filesystem_rejects_traversal() {
        let dir = tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path().join("registry")).await.unwrap();

        assert!(matches!(
            storage.get("../outside").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.put("/abs", vec![]).await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
