//! Revocation lookups for issued credentials
//!
//! Two policies implement [`RevocationStore`]: durable token records (in
//! `tinfin-registry`) and the static deny-list defined here.

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Revocation status of a credential identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationState {
    Active,
    Revoked,
    /// No record exists for the identifier
    Unknown,
}

/// The revocation backend could not answer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RevocationError(pub String);

/// Answers whether a credential identifier has been revoked
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revocation_state(&self, jti: &str) -> Result<RevocationState, RevocationError>;
}

/// Deny-list of revoked identifiers configured out of band
///
/// Every identifier not on the list is reported as active; this policy
/// cannot tell "never issued" apart from "still valid".
#[derive(Debug, Clone, Default)]
pub struct StaticRevocationList {
    revoked: HashSet<String>,
}

impl StaticRevocationList {
    pub fn new<I, S>(revoked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            revoked: revoked.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, ignoring blanks and surrounding whitespace
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[async_trait]
impl RevocationStore for StaticRevocationList {
    async fn revocation_state(&self, jti: &str) -> Result<RevocationState, RevocationError> {
        if self.revoked.contains(jti) {
            Ok(RevocationState::Revoked)
        } else {
            Ok(RevocationState::Active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_style_list() {
        let list = StaticRevocationList::parse(" a , b,,c ,");
        assert_eq!(list.len(), 3);

        let empty = StaticRevocationList::parse("");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_static_list_never_unknown() {
        let list = StaticRevocationList::new(["revoked-jti"]);

        assert_eq!(
            list.revocation_state("revoked-jti").await.unwrap(),
            RevocationState::Revoked
        );
        assert_eq!(
            list.revocation_state("never-issued").await.unwrap(),
            RevocationState::Active
        );
    }
}
