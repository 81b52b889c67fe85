//! TinFin HTTP API Server
//!
//! Serves registry payloads with pro gating, token management for signed-in
//! users, and the payment webhook that backs the pro entitlement.

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    response::Json,
    routing::get,
};
use serde_json::{Value, json};
use std::{path::Path, sync::Arc};
use time::Duration;
use tinfin::{
    Catalog, EdgeRouter, RevocationStore, RewriteStrategy, SigningSecret, StaticRevocationList,
    TokenCodec, Verifier,
};
use tinfin_registry::{
    PaymentStore, Registry, RegistryError, SqliteStorage, TokenIssuer, TokenStore,
    storage::FileSystemStorage,
};
use tower::{Layer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

mod config;
mod edge;
mod error;
mod identity;
mod models;
mod routes;

use config::{MAX_TOKEN_TTL_DAYS, RevocationPolicy, RouterStrategy, ServerConfig};
use error::{ApiError, Result};
use identity::{IdentityProvider, TrustedHeaderIdentity};

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub verifier: Verifier,
    pub issuer: TokenIssuer,
    pub payments: Arc<dyn PaymentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire the application around one record store
    ///
    /// `store` keeps token and payment records; it is also the revocation
    /// source under the durable policy.
    pub fn new<S>(config: ServerConfig, registry: Registry, store: Arc<S>) -> Result<Self>
    where
        S: TokenStore + PaymentStore + 'static,
    {
        let secret = SigningSecret::new(config.registry_secret.as_bytes())
            .map_err(|e| ApiError::Config(format!("Invalid registry secret: {}", e)))?;
        let codec = TokenCodec::new(&secret)
            .map_err(|e| ApiError::Config(format!("Invalid registry secret: {}", e)))?;

        let revocations: Arc<dyn RevocationStore> = match config.revocation_policy {
            RevocationPolicy::Durable => store.clone() as Arc<dyn RevocationStore>,
            RevocationPolicy::Static => {
                let list = StaticRevocationList::parse(&config.revoked_jtis);
                info!("Using static revocation list with {} entries", list.len());
                Arc::new(list)
            }
        };

        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&config.token_ttl_days) {
            return Err(ApiError::Config(format!(
                "Token lifetime of {} days is out of range",
                config.token_ttl_days
            )));
        }

        let identity = TrustedHeaderIdentity::new(
            &config.identity_user_header,
            &config.identity_email_header,
        )?;

        Ok(Self {
            registry: Arc::new(registry),
            verifier: Verifier::new(codec.clone(), revocations),
            issuer: TokenIssuer::new(codec, store.clone(), store.clone())
                .with_ttl(Duration::days(config.token_ttl_days)),
            payments: store,
            identity: Arc::new(identity),
            config,
        })
    }

    /// Edge router for the configured strategy
    ///
    /// The allowlist defaults to the catalog's gated names.
    pub fn edge_router(&self) -> EdgeRouter {
        match self.config.router_strategy {
            RouterStrategy::Uniform => EdgeRouter::default(),
            RouterStrategy::Allowlist => {
                let strategy = match &self.config.gated_resources {
                    Some(names) => RewriteStrategy::allowlist(names),
                    None => RewriteStrategy::allowlist(self.registry.catalog().gated_names()),
                };
                EdgeRouter::new(strategy)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tinfin_server=debug,tower_http=debug".to_string()),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    info!("Starting TinFin Server on {}:{}", config.host, config.port);

    let catalog_bytes = tokio::fs::read(&config.catalog_path).await.map_err(|e| {
        ApiError::Config(format!("Failed to read catalog {}: {}", config.catalog_path, e))
    })?;
    let catalog = Catalog::from_json(&catalog_bytes)
        .map_err(|e| ApiError::Config(format!("Invalid catalog {}: {}", config.catalog_path, e)))?;
    info!(
        "Loaded catalog {} with {} resources, {} gated",
        catalog.name().unwrap_or("(unnamed)"),
        catalog.len(),
        catalog.gated_names().len()
    );

    // Payload storage
    let storage = FileSystemStorage::new(&config.registry_dir)
        .await
        .map_err(RegistryError::from)?;
    let registry = Registry::new(Arc::new(storage), catalog);

    if let Some(seed_dir) = &config.seed_dir {
        let imported = registry.import_dir(seed_dir).await?;
        info!("Published {} payloads from {}", imported.len(), seed_dir);
    }

    // Token and payment records
    ensure_database_dir(&config.database_url).await?;
    let store = Arc::new(SqliteStorage::new(&config.database_url).await?);

    let state = AppState::new(config.clone(), registry, store)?;
    info!("Edge routing: {:?}", state.edge_router().strategy());
    info!("Issuing tokens valid for {} days", state.issuer.ttl().whole_days());

    let app = build_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("🚀 Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Full application: edge rewriting in front of the routes
///
/// The outer router only forwards to the rewritten service, so route
/// matching inside sees rewritten paths.
pub fn build_app(state: AppState) -> Router {
    let edge = edge::layer(state.edge_router());
    let cors = cors_layer(&state.config.cors_origins);
    let routes = create_router(state);

    Router::new().fallback_service(edge.layer(routes)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Registry payloads
        .merge(routes::registry::router())
        // API routes
        .nest("/api", api_routes())
        .with_state(state)
}

/// API routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tokens", routes::tokens::router())
        .nest("/webhook", routes::webhook::router())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Create the parent directory of a file-backed SQLite database
async fn ensure_database_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Health check endpoint
async fn health_check() -> Result<Json<Value>> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "tinfin-server",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": time::OffsetDateTime::now_utc().unix_timestamp()
    })))
}
