//! Caller identity for the token management endpoints
//!
//! Session handling lives in an upstream auth proxy. The proxy authenticates
//! the user and forwards the result in request headers, which
//! [`TrustedHeaderIdentity`] reads back.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, request::Parts},
};

use crate::AppState;
use crate::error::{ApiError, Result};

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

impl Identity {
    /// Principal named in issued credentials: the email, else the user id
    pub fn principal(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}

/// Resolves the user behind a request
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Trusts identity headers set by an upstream auth proxy
#[derive(Debug, Clone)]
pub struct TrustedHeaderIdentity {
    user_header: HeaderName,
    email_header: HeaderName,
}

impl TrustedHeaderIdentity {
    pub fn new(user_header: &str, email_header: &str) -> Result<Self> {
        let parse = |name: &str| {
            HeaderName::try_from(name)
                .map_err(|_| ApiError::Config(format!("Invalid identity header name: {}", name)))
        };

        Ok(Self {
            user_header: parse(user_header)?,
            email_header: parse(email_header)?,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl IdentityProvider for TrustedHeaderIdentity {
    async fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        let user_id = header_value(headers, &self.user_header)?;
        Some(Identity {
            user_id,
            email: header_value(headers, &self.email_header),
        })
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        state
            .identity
            .identify(&parts.headers)
            .await
            .ok_or(ApiError::Unauthenticated)
    }
}
