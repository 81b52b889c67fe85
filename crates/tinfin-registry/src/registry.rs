//! Content-addressed registry of block payloads

use std::sync::Arc;

use tinfin::Catalog;
use tinfin::catalog::{is_valid_name, normalize_name};

use crate::address::ContentAddress;
use crate::error::{RegistryError, Result};
use crate::storage::{BlobStorage, StorageError};

/// A payload resolved from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Normalized name, without the payload suffix
    pub name: String,
    pub content: Vec<u8>,
    /// `sha256:<hex>` digest of `content`
    pub digest: String,
    /// Whether the catalog gates this resource
    pub gated: bool,
}

/// Registry of named JSON payloads
///
/// Payload bytes are stored once under their digest; `refs/<name>` points
/// a resource name at the digest of its current payload.
pub struct Registry {
    storage: Arc<dyn BlobStorage>,
    catalog: Arc<Catalog>,
}

impl Registry {
    pub fn new(storage: Arc<dyn BlobStorage>, catalog: Catalog) -> Self {
        Self {
            storage,
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Store a payload under `name` and return its digest
    pub async fn publish(&self, name: &str, content: Vec<u8>) -> Result<String> {
        let name = checked_name(name)?;
        serde_json::from_slice::<serde_json::Value>(&content)?;

        let digest = ContentAddress::hash(&content);
        let blob_key = ContentAddress::blob_key(&digest);
        if !self.storage.exists(&blob_key).await? {
            self.storage.put(&blob_key, content).await?;
        }

        self.storage
            .put(&ContentAddress::ref_key(name), digest.clone().into_bytes())
            .await?;

        Ok(digest)
    }

    /// Digest currently referenced by `name`
    pub async fn resolve(&self, name: &str) -> Result<String> {
        let name = checked_name(name)?;
        let reference = self
            .storage
            .get(&ContentAddress::ref_key(name))
            .await
            .map_err(|e| not_found_as(name, e))?;

        let digest = String::from_utf8(reference)
            .map_err(|_| RegistryError::Storage(format!("Corrupt reference for {}", name)))?;

        if !ContentAddress::is_valid_hash(&digest) {
            return Err(RegistryError::Storage(format!(
                "Invalid digest in reference for {}",
                name
            )));
        }
        Ok(digest)
    }

    /// Load the payload for `name` (with or without the `.json` suffix)
    pub async fn fetch(&self, name: &str) -> Result<Resource> {
        let name = checked_name(name)?;
        let digest = self.resolve(name).await?;

        let content = self
            .storage
            .get(&ContentAddress::blob_key(&digest))
            .await
            .map_err(|e| not_found_as(name, e))?;

        if !ContentAddress::verify(&content, &digest) {
            return Err(RegistryError::Integrity {
                name: name.to_string(),
                expected: digest,
            });
        }

        Ok(Resource {
            name: name.to_string(),
            gated: self.catalog.requires_entitlement(name),
            content,
            digest,
        })
    }

    /// Publish every `<name>.json` file in `dir`, returning the names
    #[cfg(feature = "fs")]
    pub async fn import_dir(&self, dir: impl AsRef<std::path::Path>) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
        let mut imported = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if name == "registry" || !is_valid_name(name) {
                continue;
            }

            let content = tokio::fs::read(&path).await?;
            self.publish(name, content).await?;
            imported.push(name.to_string());
        }

        imported.sort();
        Ok(imported)
    }
}

fn checked_name(name: &str) -> Result<&str> {
    let name = normalize_name(name);
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(RegistryError::ResourceNotFound(name.to_string()))
    }
}

fn not_found_as(name: &str, err: StorageError) -> RegistryError {
    match err {
        StorageError::NotFound(_) => RegistryError::ResourceNotFound(name.to_string()),
        other => other.into(),
    }
}
