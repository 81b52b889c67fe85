//! # TinFin Registry
//!
//! Storage and issuance for the TinFin block registry:
//! - Content-addressed block payloads with integrity checks on every fetch
//! - Durable credential records with a single live credential per user
//! - Payment records backing the pro entitlement
//! - Issuing, revoking and listing registry credentials
//!
//! ## Core Concepts
//!
//! - **Resources** are JSON payloads stored once under their SHA-256 digest
//! - **Refs** point a resource name at its current digest
//! - **Token records** never hold the raw credential, only its digest
//! - **Revocation** is a soft delete; records are never removed
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tinfin::Catalog;
//! use tinfin_registry::*;
//! use tinfin_registry::storage::MemoryStorage;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::from_json(&std::fs::read("registry.json")?)?;
//! let registry = Registry::new(Arc::new(MemoryStorage::new()), catalog);
//!
//! let digest = registry.publish("auth-3", br#"{"name":"auth-3"}"#.to_vec()).await?;
//! let resource = registry.fetch("auth-3.json").await?;
//!
//! assert_eq!(resource.digest, digest);
//! println!("auth-3 gated: {}", resource.gated);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod entities;
pub mod error;
pub mod issuance;
pub mod registry;
pub mod storage;

pub use entities::{DEFAULT_TOKEN_NAME, PaymentRecord, PaymentStatus, TokenRecord};
pub use error::{RegistryError, Result};
pub use issuance::{IssuedToken, TokenIssuer};
pub use registry::{Registry, Resource};
pub use storage::{BlobStorage, PaymentStore, TokenStore};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStorage;
