//! Token management routes

use crate::{
    AppState,
    error::{ApiError, Result},
    identity::Identity,
    models::{
        CreateTokenRequest, CreateTokenResponse, RevokeTokenQuery, RevokeTokenRequest,
        SuccessResponse, TokenSummary,
    },
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use time::OffsetDateTime;
use tracing::{debug, error, info};

/// Create token routes
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_tokens).post(create_token).delete(revoke_token))
}

/// List the caller's non-revoked tokens, most recent first
async fn list_tokens(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<TokenSummary>>> {
    debug!("Listing tokens for {}", identity.user_id);

    let records = state.issuer.list_active(&identity.user_id).await.map_err(|e| {
        error!("Failed to list tokens: {}", e);
        e
    })?;

    let now = OffsetDateTime::now_utc();
    Ok(Json(
        records
            .into_iter()
            .map(|record| TokenSummary::from_record(record, now))
            .collect(),
    ))
}

/// Issue a token to a paying caller without a live token
async fn create_token(
    State(state): State<AppState>,
    identity: Identity,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateTokenResponse>)> {
    let request = CreateTokenRequest::from_body(&body);

    let issued = state
        .issuer
        .issue(
            &identity.user_id,
            identity.principal(),
            request.display_name(),
            OffsetDateTime::now_utc(),
        )
        .await?;

    info!(
        user_id = %identity.user_id,
        jti = %issued.claims.identifier,
        "Issued registry token"
    );

    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// Revoke by `jti` in the JSON body, or by record `id` in the query string
async fn revoke_token(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<RevokeTokenQuery>,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    let jti = RevokeTokenRequest::from_body(&body)
        .jti
        .filter(|jti| !jti.trim().is_empty());
    let id = query.id.filter(|id| !id.trim().is_empty());

    match (jti, id) {
        (Some(jti), _) => {
            state.issuer.revoke_by_jti(&identity.user_id, &jti).await?;
            info!(user_id = %identity.user_id, jti = %jti, "Revoked registry token");
        }
        (None, Some(id)) => {
            state.issuer.revoke_by_id(&identity.user_id, &id).await?;
            info!(user_id = %identity.user_id, id = %id, "Revoked registry token");
        }
        (None, None) => {
            return Err(ApiError::bad_request(
                "Provide a token jti in the body or an id query parameter",
            ));
        }
    }

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, TEST_EMAIL_HEADER, TEST_USER_HEADER};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder
                .header(TEST_USER_HEADER, user)
                .header(TEST_EMAIL_HEADER, format!("{}@example.com", user));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_identity() {
        let (state, _) = testing::state(testing::config()).await;
        let app = crate::build_app(state);

        for method in [Method::GET, Method::POST, Method::DELETE] {
            let response = app
                .clone()
                .oneshot(request(method, "/api/tokens", None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_create_requires_payment() {
        let (state, _) = testing::state(testing::config()).await;
        let app = crate::build_app(state);

        let response = app
            .oneshot(request(Method::POST, "/api/tokens", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_create_list_revoke() {
        let (state, store) = testing::state(testing::config()).await;
        testing::mark_paid(&store, "u1").await;
        let app = crate::build_app(state);

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/tokens",
                Some("u1"),
                Some(json!({"name": "laptop"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["plan"], "pro");
        assert_eq!(created["scope"], "registry");
        assert_eq!(created["sub"], "u1@example.com");
        let jti = created["jti"].as_str().unwrap().to_string();
        assert!(created["token"].as_str().unwrap().contains('.'));

        // A second token is refused while the first is live
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/tokens", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/tokens", Some("u1"), None))
            .await
            .unwrap();
        let listed = json_body(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["name"], "laptop");
        assert_eq!(listed[0]["jti"], jti.as_str());
        assert!(listed[0].get("token").is_none());

        let response = app
            .clone()
            .oneshot(request(
                Method::DELETE,
                "/api/tokens",
                Some("u1"),
                Some(json!({ "jti": jti })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);

        let response = app
            .oneshot(request(Method::GET, "/api/tokens", Some("u1"), None))
            .await
            .unwrap();
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_by_record_id() {
        let (state, store) = testing::state(testing::config()).await;
        testing::issue_token(&state, &store, "u1").await;
        let id = state.issuer.list_active("u1").await.unwrap()[0].id.clone();
        let app = crate::build_app(state);

        let response = app
            .oneshot(request(
                Method::DELETE,
                &format!("/api/tokens?id={}", id),
                Some("u1"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_revoke_errors() {
        let (state, store) = testing::state(testing::config()).await;
        let token = testing::issue_token(&state, &store, "u1").await;
        let jti = state.verifier.codec().decode(&token).unwrap().claims.identifier;
        let app = crate::build_app(state);

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/api/tokens", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Another user's token is indistinguishable from a missing one
        let response = app
            .oneshot(request(
                Method::DELETE,
                "/api/tokens",
                Some("u2"),
                Some(json!({ "jti": jti })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
