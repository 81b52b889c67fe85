//! Edge rewriting of registry paths
//!
//! Runs before route matching so that no registry payload can be reached
//! through a path that skips the authorizing handler. It makes no
//! authorization decision itself.

use std::collections::BTreeSet;

use crate::catalog::{PAYLOAD_SUFFIX, normalize_name};

/// Path prefix under which registry payloads are requested
pub const REGISTRY_PREFIX: &str = "/r/";

/// Path prefix of the protected, always-gated handler
pub const PROTECTED_PREFIX: &str = "/secure-r/";

/// Which requests are redirected to a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteStrategy {
    /// Every `/r/<name>.json` goes to the registry handler, which classifies
    /// per resource
    Uniform,
    /// Only the listed names go to the protected handler; everything else is
    /// left alone
    Allowlist(BTreeSet<String>),
}

impl RewriteStrategy {
    pub fn allowlist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Allowlist(
            names
                .into_iter()
                .map(|name| normalize_name(name.as_ref()).to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRouter {
    strategy: RewriteStrategy,
}

impl EdgeRouter {
    pub fn new(strategy: RewriteStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &RewriteStrategy {
        &self.strategy
    }

    /// The rewritten path for `path`, or `None` to leave the request alone
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(REGISTRY_PREFIX)?;
        if !rest.ends_with(PAYLOAD_SUFFIX) {
            return None;
        }

        let name = normalize_name(rest);
        if name.is_empty() {
            return None;
        }

        match &self.strategy {
            RewriteStrategy::Uniform => Some(format!("{}{}", REGISTRY_PREFIX, name)),
            RewriteStrategy::Allowlist(names) if names.contains(name) => {
                Some(format!("{}{}", PROTECTED_PREFIX, name))
            }
            RewriteStrategy::Allowlist(_) => None,
        }
    }

    /// The path a request ends up at after rewriting
    pub fn effective_path(&self, path: &str) -> String {
        self.rewrite(path).unwrap_or_else(|| path.to_string())
    }
}

impl Default for EdgeRouter {
    fn default() -> Self {
        Self::new(RewriteStrategy::Uniform)
    }
}
