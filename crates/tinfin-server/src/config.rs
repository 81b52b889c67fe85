//! Server configuration management

use crate::error::{ApiError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use zeroize::Zeroizing;

/// Signing secret used when running in development without one configured
const DEVELOPMENT_SECRET: &str = "tinfin-development-secret-do-not-use-in-production";

/// Upper bound for `TINFIN_TOKEN_TTL_DAYS`
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ApiError::Config(format!("Invalid TINFIN_ENV value: {}", other))),
        }
    }
}

/// Where revocation state is looked up during verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationPolicy {
    /// Token records in the database
    Durable,
    /// Fixed deny-list from `TINFIN_REVOKED_JTIS`
    Static,
}

impl FromStr for RevocationPolicy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "durable" => Ok(Self::Durable),
            "static" => Ok(Self::Static),
            other => Err(ApiError::Config(format!(
                "Invalid TINFIN_REVOCATION_POLICY value: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStrategy {
    Uniform,
    Allowlist,
}

impl FromStr for RouterStrategy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "allowlist" => Ok(Self::Allowlist),
            other => Err(ApiError::Config(format!(
                "Invalid TINFIN_ROUTER_STRATEGY value: {}",
                other
            ))),
        }
    }
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    pub environment: Environment,

    /// Shared secret for signing registry credentials
    pub registry_secret: Zeroizing<String>,

    /// Lifetime of issued credentials in days
    pub token_ttl_days: i64,

    pub revocation_policy: RevocationPolicy,

    /// Deny-list used by the static revocation policy
    pub revoked_jtis: String,

    pub router_strategy: RouterStrategy,

    /// Explicit allowlist; `None` derives it from the catalog
    pub gated_resources: Option<Vec<String>>,

    /// SQLite connection string for token and payment records
    pub database_url: String,

    /// Root directory of the content-addressed payload store
    pub registry_dir: String,

    /// Catalog file with resource metadata
    pub catalog_path: String,

    /// Directory of `<name>.json` payloads published at startup
    pub seed_dir: Option<String>,

    /// HMAC secret for payment webhooks; webhooks are refused without it
    pub webhook_secret: Option<Zeroizing<String>>,

    /// Header carrying the authenticated user id from the upstream proxy
    pub identity_user_header: String,

    /// Header carrying the authenticated user email from the upstream proxy
    pub identity_email_header: String,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment: Environment = var("TINFIN_ENV", "development").parse()?;

        let registry_secret = match (non_empty("TINFIN_REGISTRY_SECRET"), environment) {
            (Some(secret), _) => Zeroizing::new(secret),
            (None, Environment::Production) => {
                return Err(ApiError::Config(
                    "TINFIN_REGISTRY_SECRET must be set in production".to_string(),
                ));
            }
            (None, Environment::Development) => {
                warn!("TINFIN_REGISTRY_SECRET not set, using the development secret");
                Zeroizing::new(DEVELOPMENT_SECRET.to_string())
            }
        };

        let token_ttl_days: i64 = var("TINFIN_TOKEN_TTL_DAYS", "30")
            .parse()
            .map_err(|_| ApiError::Config("Invalid TINFIN_TOKEN_TTL_DAYS value".to_string()))?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            return Err(ApiError::Config(format!(
                "TINFIN_TOKEN_TTL_DAYS must be between 1 and {}",
                MAX_TOKEN_TTL_DAYS
            )));
        }

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "3000")
                .parse()
                .map_err(|_| ApiError::Config("Invalid PORT value".to_string()))?,
            environment,
            registry_secret,
            token_ttl_days,
            revocation_policy: var("TINFIN_REVOCATION_POLICY", "durable").parse()?,
            revoked_jtis: var("TINFIN_REVOKED_JTIS", ""),
            router_strategy: var("TINFIN_ROUTER_STRATEGY", "uniform").parse()?,
            gated_resources: non_empty("TINFIN_GATED_RESOURCES").map(|raw| split_list(&raw)),
            database_url: var("DATABASE_URL", "sqlite:./data/tinfin.db"),
            registry_dir: var("TINFIN_REGISTRY_DIR", "./data/registry"),
            catalog_path: var("TINFIN_CATALOG_PATH", "registry.json"),
            seed_dir: non_empty("TINFIN_SEED_DIR"),
            webhook_secret: non_empty("TINFIN_WEBHOOK_SECRET").map(Zeroizing::new),
            identity_user_header: var("TINFIN_IDENTITY_USER_HEADER", "x-tinfin-user-id"),
            identity_email_header: var("TINFIN_IDENTITY_EMAIL_HEADER", "x-tinfin-user-email"),
            cors_origins: split_list(&var("CORS_ORIGINS", "*")),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("registry_secret", &"[REDACTED]")
            .field("token_ttl_days", &self.token_ttl_days)
            .field("revocation_policy", &self.revocation_policy)
            .field("router_strategy", &self.router_strategy)
            .field("gated_resources", &self.gated_resources)
            .field("database_url", &self.database_url)
            .field("registry_dir", &self.registry_dir)
            .field("catalog_path", &self.catalog_path)
            .field("seed_dir", &self.seed_dir)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            registry_secret: Zeroizing::new(DEVELOPMENT_SECRET.to_string()),
            token_ttl_days: 30,
            revocation_policy: RevocationPolicy::Durable,
            revoked_jtis: String::new(),
            router_strategy: RouterStrategy::Uniform,
            gated_resources: None,
            database_url: "sqlite:./data/tinfin.db".to_string(),
            registry_dir: "./data/registry".to_string(),
            catalog_path: "registry.json".to_string(),
            seed_dir: None,
            webhook_secret: None,
            identity_user_header: "x-tinfin-user-id".to_string(),
            identity_email_header: "x-tinfin-user-email".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}
