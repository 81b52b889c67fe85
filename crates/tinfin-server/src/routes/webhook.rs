//! Payment provider webhook

use crate::{
    AppState,
    error::{ApiError, Result},
    models::{PaymentEvent, SuccessResponse},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "webhook-signature";

/// Create webhook routes
pub fn router() -> Router<AppState> {
    Router::new().route("/payments", post(payment_webhook))
}

/// Record a paid or refunded order reported by the payment provider
async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    let secret = state
        .config
        .webhook_secret
        .as_deref()
        .ok_or(ApiError::WebhookNotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidWebhookSignature)?;

    if !verify_signature(secret.as_bytes(), &body, signature) {
        warn!("Rejected payment webhook with an invalid signature");
        return Err(ApiError::InvalidWebhookSignature);
    }

    let event: PaymentEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected payment webhook payload: {}", e);
        ApiError::bad_request("Unrecognized payment event")
    })?;

    let kind = event.kind();
    let record = event.into_record(OffsetDateTime::now_utc());
    state.payments.upsert_payment(&record).await?;

    info!(
        kind,
        order_id = %record.id,
        user_id = %record.user_id,
        "Recorded payment event"
    );

    Ok(Json(SuccessResponse::ok()))
}

/// Constant-time check of a hex signature over `body`
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    if provided.len() != expected.len() {
        let _ = expected.as_slice().ct_eq(expected.as_slice());
        return false;
    }
    bool::from(provided.as_slice().ct_eq(expected.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tinfin_registry::PaymentStore;
    use tower::ServiceExt;

    /// Hex HMAC-SHA256 of `body`, as the provider sends it
    fn sign(secret: &[u8], body: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(secret).ok()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    fn webhook_request(body: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhook/payments")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn order(kind: &str) -> String {
        json!({
            "type": kind,
            "data": {"id": "ord_1", "user_id": "u1", "amount": 4900, "currency": "usd"}
        })
        .to_string()
    }

    #[test]
    fn test_signature_check() {
        let signature = sign(b"secret", b"body").unwrap();
        assert!(verify_signature(b"secret", b"body", &signature));
        assert!(!verify_signature(b"secret", b"other", &signature));
        assert!(!verify_signature(b"other", b"body", &signature));
        assert!(!verify_signature(b"secret", b"body", "zz"));
        assert!(!verify_signature(b"secret", b"body", "abcd"));
    }

    #[tokio::test]
    async fn test_paid_then_refunded() {
        let (state, store) = testing::state(testing::config()).await;
        let app = crate::build_app(state);

        let paid = order("order.paid");
        let signature = sign(testing::WEBHOOK_SECRET.as_bytes(), paid.as_bytes());
        let response = app.clone().oneshot(webhook_request(&paid, signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.has_paid("u1").await.unwrap());

        let refunded = order("order.refunded");
        let signature = sign(testing::WEBHOOK_SECRET.as_bytes(), refunded.as_bytes());
        let response = app.oneshot(webhook_request(&refunded, signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!store.has_paid("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_bad_signature() {
        let (state, store) = testing::state(testing::config()).await;
        let app = crate::build_app(state);

        let paid = order("order.paid");
        let response = app
            .clone()
            .oneshot(webhook_request(&paid, sign(b"wrong", paid.as_bytes())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(webhook_request(&paid, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!store.has_paid("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_unknown_event() {
        let (state, _) = testing::state(testing::config()).await;
        let app = crate::build_app(state);

        let body = order("subscription.created");
        let signature = sign(testing::WEBHOOK_SECRET.as_bytes(), body.as_bytes());
        let response = app.oneshot(webhook_request(&body, signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unconfigured_webhook() {
        let mut config = testing::config();
        config.webhook_secret = None;
        let (state, _) = testing::state(config).await;
        let app = crate::build_app(state);

        let body = order("order.paid");
        let response = app
            .oneshot(webhook_request(&body, Some("00".into())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
