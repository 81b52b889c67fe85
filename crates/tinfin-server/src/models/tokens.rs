//! Token management models

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tinfin::Plan;
use tinfin_registry::{DEFAULT_TOKEN_NAME, IssuedToken, TokenRecord};

/// Request to create a token; the body may be omitted entirely
#[derive(Debug, Default, Deserialize)]
pub struct CreateTokenRequest {
    pub name: Option<String>,
}

impl CreateTokenRequest {
    /// Lenient parse: an empty or unparsable body means defaults
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_TOKEN_NAME)
    }
}

/// The only response that ever contains the raw token
#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub sub: String,
    pub plan: Plan,
    pub exp: i64,
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<IssuedToken> for CreateTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        let claims = issued.claims;
        Self {
            token: issued.token,
            sub: claims.subject,
            plan: claims.plan,
            exp: claims.expires_at,
            jti: claims.identifier,
            scope: claims.issued_scope,
        }
    }
}

/// Listing entry for a token record
#[derive(Debug, Serialize)]
pub struct TokenSummary {
    pub id: String,
    pub name: String,
    pub jti: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub expired: bool,
}

impl TokenSummary {
    pub fn from_record(record: TokenRecord, now: OffsetDateTime) -> Self {
        Self {
            expired: record.expires_at <= now,
            id: record.id,
            name: record.name,
            jti: record.jti,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// JSON body of a revocation request
#[derive(Debug, Default, Deserialize)]
pub struct RevokeTokenRequest {
    pub jti: Option<String>,
}

impl RevokeTokenRequest {
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// Query parameters of a revocation request
#[derive(Debug, Default, Deserialize)]
pub struct RevokeTokenQuery {
    pub id: Option<String>,
}
