//! Error handling for the API server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tinfin::TokenError;
use tinfin_registry::RegistryError;
use tracing::{error, warn};

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Registry token required. Create one at /api/tokens and send it as a Bearer token")]
    MissingCredential,

    #[error("Token rejected: {0}")]
    Verification(#[from] TokenError),

    #[error("A pro plan is required for this resource")]
    PlanNotEntitled,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Webhook signature is missing or invalid")]
    InvalidWebhookSignature,

    #[error("Payment webhooks are not configured")]
    WebhookNotConfigured,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status and stable machine code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingCredential => (StatusCode::UNAUTHORIZED, "missing_credential"),
            ApiError::Verification(e) => token_status(e),
            ApiError::PlanNotEntitled => (StatusCode::UNAUTHORIZED, "plan_not_entitled"),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Registry(e) => match e {
                RegistryError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, "resource_not_found"),
                RegistryError::TokenNotFound(_) => (StatusCode::NOT_FOUND, "token_not_found"),
                RegistryError::ActiveTokenExists(_) => (StatusCode::CONFLICT, "active_token_exists"),
                RegistryError::PaymentRequired(_) => {
                    (StatusCode::PAYMENT_REQUIRED, "payment_required")
                }
                RegistryError::Token(e) => token_status(e),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            ApiError::InvalidWebhookSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            ApiError::WebhookNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "webhook_not_configured")
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Config(_) | ApiError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

fn token_status(err: &TokenError) -> (StatusCode, &'static str) {
    if err.is_credential_fault() {
        (StatusCode::FORBIDDEN, err.code())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, err.code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Internal details stay in the log
        let message = if status.is_server_error() {
            error!(code, "Request failed: {}", self);
            match status {
                StatusCode::SERVICE_UNAVAILABLE => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            if status == StatusCode::FORBIDDEN {
                warn!(code, "Credential rejected");
            }
            self.to_string()
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "code": code,
            "message": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Convenience functions for common errors
impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }
}
