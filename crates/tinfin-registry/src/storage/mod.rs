//! Storage abstraction for registry data
//!
//! Payload bytes go through [`BlobStorage`]; credential and payment records
//! go through [`TokenStore`] and [`PaymentStore`]. Every [`TokenStore`] is
//! also a [`RevocationStore`], which makes it usable as the durable
//! revocation policy.

use async_trait::async_trait;
use time::OffsetDateTime;
use tinfin::RevocationStore;

use crate::entities::{PaymentRecord, TokenRecord};
use crate::error::Result;

pub mod blob_storage;
pub mod memory_store;

#[cfg(feature = "fs")]
pub mod file_storage;

#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use blob_storage::{BlobStorage, MemoryStorage, StorageError};
pub use memory_store::MemoryStore;

#[cfg(feature = "fs")]
pub use file_storage::FileSystemStorage;

#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;

/// Durable records of issued credentials
#[async_trait]
pub trait TokenStore: RevocationStore {
    /// Insert `record` unless its user already holds a live token at `now`
    ///
    /// The check and the insert are atomic per user. A refusal is reported
    /// as [`RegistryError::ActiveTokenExists`](crate::RegistryError::ActiveTokenExists).
    async fn insert_if_no_active(&self, record: &TokenRecord, now: OffsetDateTime) -> Result<()>;

    /// Revoke the token with identifier `jti` owned by `user_id`
    ///
    /// Revoking an already revoked token succeeds.
    async fn revoke_by_jti(&self, user_id: &str, jti: &str) -> Result<()>;

    /// Revoke by store-internal record id, scoped to `user_id`
    async fn revoke_by_id(&self, user_id: &str, id: &str) -> Result<()>;

    /// Non-revoked records of `user_id`, most recent first
    async fn list_unrevoked(&self, user_id: &str) -> Result<Vec<TokenRecord>>;

    async fn get_by_jti(&self, jti: &str) -> Result<Option<TokenRecord>>;
}

/// Payment records reported by the payment provider
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert or replace the record with the same provider id
    async fn upsert_payment(&self, payment: &PaymentRecord) -> Result<()>;

    /// Whether `user_id` has at least one paid record
    async fn has_paid(&self, user_id: &str) -> Result<bool>;

    async fn list_payments(&self, user_id: &str) -> Result<Vec<PaymentRecord>>;
}
