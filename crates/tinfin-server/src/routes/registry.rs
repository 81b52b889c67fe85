//! Registry payload routes
//!
//! `/r/{name}` serves open resources directly and gated resources only to
//! verified pro credentials. `/secure-r/{name}` gates everything it serves.

use crate::{
    AppState,
    error::{ApiError, Result},
};
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tinfin::{Claims, Plan};
use tinfin_registry::Resource;
use tracing::debug;

/// Alternate header carrying the registry token
pub const TOKEN_HEADER: &str = "tinfin_registry_token";

/// Create registry routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/r/{name}", get(get_resource))
        .route("/secure-r/{name}", get(get_protected_resource))
}

/// Serve a resource, gated per the catalog
async fn get_resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let resource = state.registry.fetch(&name).await?;

    if resource.gated {
        authorize(&state, &headers).await?;
    }

    debug!("Serving {} (gated: {})", resource.name, resource.gated);
    Ok(payload_response(resource))
}

/// Serve a resource that always requires a pro credential
async fn get_protected_resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let mut resource = state.registry.fetch(&name).await?;
    resource.gated = true;

    authorize(&state, &headers).await?;

    debug!("Serving protected {}", resource.name);
    Ok(payload_response(resource))
}

/// Verify the presented credential and require the pro plan
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Claims> {
    let token = extract_credential(headers).ok_or(ApiError::MissingCredential)?;
    let claims = state.verifier.verify_now(&token).await?;

    if claims.plan != Plan::Pro {
        return Err(ApiError::PlanNotEntitled);
    }

    Ok(claims)
}

/// Bearer token first, then the alternate header
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

fn payload_response(resource: Resource) -> Response {
    let cache_control = if resource.gated {
        "private, no-store"
    } else {
        "public, max-age=0"
    };

    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, cache_control),
        ],
        [(header::ETAG, format!("\"{}\"", resource.digest))],
        resource.content,
    )
        .into_response()
}
