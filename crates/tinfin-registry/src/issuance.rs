//! Issuing, revoking and listing registry credentials

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tinfin::{Claims, TokenCodec};

use crate::address::ContentAddress;
use crate::entities::TokenRecord;
use crate::error::{RegistryError, Result};
use crate::storage::{PaymentStore, TokenStore};

/// Default credential lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::days(30);

/// A freshly issued credential
///
/// `token` is the only place the raw credential ever exists; the stored
/// `record` carries its digest.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub record: TokenRecord,
}

/// Issues credentials to paying principals, one live credential at a time
#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    tokens: Arc<dyn TokenStore>,
    payments: Arc<dyn PaymentStore>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        codec: TokenCodec,
        tokens: Arc<dyn TokenStore>,
        payments: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            codec,
            tokens,
            payments,
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a credential for `user_id`
    ///
    /// `subject` is the principal named inside the credential (the user's
    /// email where known). Fails with [`RegistryError::PaymentRequired`]
    /// without a paid order and [`RegistryError::ActiveTokenExists`] while
    /// another live credential exists.
    pub async fn issue(
        &self,
        user_id: &str,
        subject: &str,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<IssuedToken> {
        if !self.payments.has_paid(user_id).await? {
            return Err(RegistryError::PaymentRequired(user_id.to_string()));
        }

        let expires_at = now
            .checked_add(self.ttl)
            .ok_or(RegistryError::TokenLifetime(self.ttl))?;
        let claims = Claims::pro(subject, expires_at.unix_timestamp());
        let token = self.codec.encode(&claims)?;

        let record = TokenRecord::new(
            user_id,
            name,
            claims.identifier.clone(),
            ContentAddress::hash(token.as_bytes()),
            now,
            expires_at,
        );

        self.tokens.insert_if_no_active(&record, now).await?;

        Ok(IssuedToken {
            token,
            claims,
            record,
        })
    }

    pub async fn revoke_by_jti(&self, user_id: &str, jti: &str) -> Result<()> {
        self.tokens.revoke_by_jti(user_id, jti).await
    }

    pub async fn revoke_by_id(&self, user_id: &str, id: &str) -> Result<()> {
        self.tokens.revoke_by_id(user_id, id).await
    }

    /// Non-revoked records of `user_id`, most recent first
    pub async fn list_active(&self, user_id: &str) -> Result<Vec<TokenRecord>> {
        self.tokens.list_unrevoked(user_id).await
    }
}
