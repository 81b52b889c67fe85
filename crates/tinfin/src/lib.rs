//! TinFin registry credentials
//!
//! Core building blocks for gating pro registry content:
//! - a compact, HMAC-signed credential format ([`codec`])
//! - verification of signature, expiry, scope and revocation ([`verify`])
//! - revocation policies ([`revocation`])
//! - resource classification from catalog metadata ([`catalog`])
//! - edge rewriting of registry paths ([`router`])
//!
//! Nothing in this crate performs I/O except through a [`RevocationStore`].
//!
//! ```rust
//! use std::sync::Arc;
//! use tinfin::{Claims, SigningSecret, StaticRevocationList, TokenCodec, Verifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = TokenCodec::new(&SigningSecret::new("registry-secret")?)?;
//! let token = codec.encode(&Claims::pro("alice@example.com", 2_000_000_000))?;
//!
//! let verifier = Verifier::new(codec, Arc::new(StaticRevocationList::default()));
//! let claims = verifier.verify(&token, 1_900_000_000).await?;
//! assert_eq!(claims.subject, "alice@example.com");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod claims;
pub mod codec;
pub mod error;
pub mod revocation;
pub mod router;
pub mod verify;

pub use catalog::{Catalog, ResourceMeta};
pub use claims::{Claims, Plan, REGISTRY_SCOPE};
pub use codec::{DecodedToken, SecretError, SigningSecret, TokenCodec};
pub use error::{Result, TokenError};
pub use revocation::{RevocationError, RevocationState, RevocationStore, StaticRevocationList};
pub use router::{EdgeRouter, RewriteStrategy};
pub use verify::Verifier;
