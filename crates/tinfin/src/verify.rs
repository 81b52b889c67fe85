//! Credential verification
//!
//! Checks run cheapest first: the signature is compared before any claim is
//! inspected, and the revocation store (the only step that may do I/O) is
//! consulted last.

use std::sync::Arc;

use crate::claims::{Claims, REGISTRY_SCOPE};
use crate::codec::TokenCodec;
use crate::error::{Result, TokenError};
use crate::revocation::{RevocationState, RevocationStore};

/// Verifies compact credentials against a secret and a revocation policy
#[derive(Clone)]
pub struct Verifier {
    codec: TokenCodec,
    revocations: Arc<dyn RevocationStore>,
}

impl Verifier {
    pub fn new(codec: TokenCodec, revocations: Arc<dyn RevocationStore>) -> Self {
        Self { codec, revocations }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify a compact credential at the given Unix time
    pub async fn verify(&self, compact: &str, now: i64) -> Result<Claims> {
        let decoded = self.codec.decode(compact)?;

        self.codec
            .verify_signature(&decoded.payload_segment, &decoded.signature_segment)?;

        let claims = decoded.claims;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired {
                expires_at: claims.expires_at,
            });
        }

        if let Some(scope) = &claims.issued_scope {
            if scope != REGISTRY_SCOPE {
                return Err(TokenError::InvalidScope(scope.clone()));
            }
        }

        match self.revocations.revocation_state(&claims.identifier).await? {
            RevocationState::Active => Ok(claims),
            RevocationState::Revoked => Err(TokenError::Revoked),
            RevocationState::Unknown => Err(TokenError::NotFound),
        }
    }

    /// Verify against the current wall clock
    pub async fn verify_now(&self, compact: &str) -> Result<Claims> {
        self.verify(compact, time::OffsetDateTime::now_utc().unix_timestamp())
            .await
    }
}
