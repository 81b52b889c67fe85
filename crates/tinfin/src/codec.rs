//! Compact two-segment credential format
//!
//! ```text
//! base64url(JSON(claims)) "." base64url(HMAC-SHA256(payload_segment, secret))
//! ```
//!
//! Both segments use the URL-safe alphabet without padding. There is no
//! header segment: the algorithm is fixed.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::claims::Claims;
use crate::error::{Result, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// Separator between the payload and signature segments
pub const SEGMENT_DELIMITER: char = '.';

/// Errors raised while setting up a codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("Signing secret must not be empty")]
    Empty,

    #[error("Signing secret has an unusable length")]
    InvalidLength,
}

/// Shared secret used to sign registry credentials
///
/// `Debug` never prints the secret, and the bytes are zeroized on drop.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> std::result::Result<Self, SecretError> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningSecret").field(&"[REDACTED]").finish()
    }
}

/// A compact token split into its parts, with the payload parsed
///
/// The signature has NOT been checked at this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub claims: Claims,
    pub payload_segment: String,
    pub signature_segment: String,
}

/// Encodes and decodes compact registry credentials
///
/// Only the zeroizing secret is kept; keyed MAC state lives for one call.
#[derive(Clone)]
pub struct TokenCodec {
    secret: SigningSecret,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret) -> std::result::Result<Self, SecretError> {
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SecretError::InvalidLength)?;
        Ok(Self {
            secret: secret.clone(),
        })
    }

    /// Serialize and sign claims into a compact token
    pub fn encode(&self, claims: &Claims) -> Result<String> {
        let json = serde_json::to_vec(claims)
            .map_err(|e| TokenError::InvalidPayload(e.to_string()))?;
        let payload_segment = URL_SAFE_NO_PAD.encode(json);
        let signature_segment = URL_SAFE_NO_PAD.encode(self.sign(&payload_segment)?);

        Ok(format!(
            "{}{}{}",
            payload_segment, SEGMENT_DELIMITER, signature_segment
        ))
    }

    /// Split a compact token and parse its payload
    pub fn decode(&self, compact: &str) -> Result<DecodedToken> {
        let mut segments = compact.split(SEGMENT_DELIMITER);
        let (payload_segment, signature_segment) =
            match (segments.next(), segments.next(), segments.next()) {
                (Some(p), Some(s), None) if !p.is_empty() && !s.is_empty() => (p, s),
                _ => return Err(TokenError::MalformedToken),
            };

        let payload = URL_SAFE_NO_PAD
            .decode(payload_segment)
            .map_err(|_| TokenError::MalformedToken)?;

        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::InvalidPayload(e.to_string()))?;

        Ok(DecodedToken {
            claims,
            payload_segment: payload_segment.to_string(),
            signature_segment: signature_segment.to_string(),
        })
    }

    /// HMAC-SHA256 over the exact bytes of the payload segment
    pub fn sign(&self, payload_segment: &str) -> Result<[u8; 32]> {
        // Accepted once in `new`, so this cannot fail for a built codec
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| TokenError::BadSignature)?;
        mac.update(payload_segment.as_bytes());

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&mac.finalize().into_bytes());
        Ok(digest)
    }

    /// Check the signature segment against the payload segment in constant time
    pub fn verify_signature(&self, payload_segment: &str, signature_segment: &str) -> Result<()> {
        let expected = self.sign(payload_segment)?;
        let provided = URL_SAFE_NO_PAD
            .decode(signature_segment)
            .map_err(|_| TokenError::BadSignature)?;

        if provided.len() != expected.len() {
            let _ = expected.as_slice().ct_eq(expected.as_slice());
            return Err(TokenError::BadSignature);
        }

        if bool::from(provided.as_slice().ct_eq(expected.as_slice())) {
            Ok(())
        } else {
            Err(TokenError::BadSignature)
        }
    }
}
