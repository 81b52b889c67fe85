//! Error types for the TinFin registry

use thiserror::Error;

use crate::storage::blob_storage::StorageError;

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Stored content for {name} does not match digest {expected}")]
    Integrity { name: String, expected: String },

    #[error("Active token exists for user {0}")]
    ActiveTokenExists(String),

    #[error("Payment required for user {0}")]
    PaymentRequired(String),

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Token lifetime of {0} puts expiry out of range")]
    TokenLifetime(time::Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Token error: {0}")]
    Token(#[from] tinfin::TokenError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Time error: {0}")]
    Time(#[from] time::error::ComponentRange),
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => RegistryError::ResourceNotFound(key),
            other => RegistryError::Storage(other.to_string()),
        }
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
