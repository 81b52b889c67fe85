//! Credential claims carried inside a registry token

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The only scope a registry credential may carry
pub const REGISTRY_SCOPE: &str = "registry";

/// Entitlement level granted by a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Pro,
    Free,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Pro => "pro",
            Plan::Free => "free",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed claims of a registry credential
///
/// Field order is the serialization order, which keeps encoding
/// deterministic for a given set of claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal the credential was issued to
    #[serde(rename = "sub")]
    pub subject: String,

    pub plan: Plan,

    /// Unix timestamp (seconds); the credential is invalid at or after it
    #[serde(rename = "exp")]
    pub expires_at: i64,

    /// Unique credential identifier used for revocation lookups
    #[serde(rename = "jti")]
    pub identifier: String,

    #[serde(rename = "scope", default, skip_serializing_if = "Option::is_none")]
    pub issued_scope: Option<String>,
}

impl Claims {
    /// Claims for a fresh pro credential scoped to the registry
    pub fn pro(subject: impl Into<String>, expires_at: i64) -> Self {
        Self {
            subject: subject.into(),
            plan: Plan::Pro,
            expires_at,
            identifier: Uuid::new_v4().to_string(),
            issued_scope: Some(REGISTRY_SCOPE.to_string()),
        }
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_scope(mut self, scope: Option<impl Into<String>>) -> Self {
        self.issued_scope = scope.map(Into::into);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// True once `now` has reached the expiry instant
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
