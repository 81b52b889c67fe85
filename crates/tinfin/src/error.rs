//! Error types for credential handling
//!
//! Every way a presented credential can be refused has its own variant so
//! callers can log and test the precise reason, while the transport layer is
//! free to collapse them into a single refusal.

use thiserror::Error;

use crate::revocation::RevocationError;

/// Reasons a credential cannot be decoded or verified
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token payload: {0}")]
    InvalidPayload(String),

    #[error("Bad signature")]
    BadSignature,

    #[error("Token expired at {expires_at}")]
    Expired { expires_at: i64 },

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Token has been revoked")]
    Revoked,

    #[error("Token not found in registry records")]
    NotFound,

    #[error("Revocation store unavailable: {0}")]
    StoreUnavailable(#[from] RevocationError),
}

impl TokenError {
    /// Stable machine-readable code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::MalformedToken => "malformed_token",
            TokenError::InvalidPayload(_) => "invalid_payload",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired { .. } => "expired",
            TokenError::InvalidScope(_) => "invalid_scope",
            TokenError::Revoked => "revoked",
            TokenError::NotFound => "not_found",
            TokenError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Whether the failure is caused by the presented credential rather than
    /// by infrastructure
    pub fn is_credential_fault(&self) -> bool {
        !matches!(self, TokenError::StoreUnavailable(_))
    }
}

/// Result type for credential operations
pub type Result<T> = std::result::Result<T, TokenError>;
