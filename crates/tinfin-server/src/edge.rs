//! Edge rewriting applied in front of the router
//!
//! `Router::layer` only wraps matched routes, so the rewrite wraps the whole
//! router as a tower service instead. Route matching then sees the
//! rewritten path.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{Uri, uri::PathAndQuery},
};
use tinfin::EdgeRouter;
use tower::util::MapRequestLayer;
use tracing::{debug, warn};

/// Layer applying `router` to every request URI
pub fn layer(
    router: EdgeRouter,
) -> MapRequestLayer<impl Fn(Request) -> Request + Clone + Send + Sync + 'static> {
    let router = Arc::new(router);
    MapRequestLayer::new(move |request: Request| rewrite_request(&router, request))
}

/// Rewrite the request path, keeping the query string
pub fn rewrite_request(router: &EdgeRouter, mut request: Request) -> Request {
    let Some(rewritten) = router.rewrite(request.uri().path()) else {
        return request;
    };

    let target = match request.uri().query() {
        Some(query) => format!("{}?{}", rewritten, query),
        None => rewritten,
    };

    let mut parts = request.uri().clone().into_parts();
    match target.parse::<PathAndQuery>() {
        Ok(path_and_query) => parts.path_and_query = Some(path_and_query),
        Err(e) => {
            warn!("Edge rewrite produced an invalid path {}: {}", target, e);
            return request;
        }
    }

    match Uri::from_parts(parts) {
        Ok(uri) => {
            debug!("Edge rewrite {} -> {}", request.uri().path(), uri.path());
            *request.uri_mut() = uri;
        }
        Err(e) => warn!("Edge rewrite failed for {}: {}", target, e),
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::{Router, routing::get};
    use http_body_util::BodyExt;
    use tinfin::RewriteStrategy;
    use tower::{Layer, ServiceExt};

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_keeps_query_string() {
        let router = EdgeRouter::default();
        let rewritten = rewrite_request(&router, request("/r/auth-1.json?v=2"));
        assert_eq!(rewritten.uri().path(), "/r/auth-1");
        assert_eq!(rewritten.uri().query(), Some("v=2"));
    }

    #[test]
    fn test_untouched_paths() {
        let router = EdgeRouter::new(RewriteStrategy::allowlist(["auth-3"]));
        for uri in ["/r/auth-1.json", "/api/tokens", "/health"] {
            assert_eq!(rewrite_request(&router, request(uri)).uri().path(), uri);
        }
        assert_eq!(
            rewrite_request(&router, request("/r/auth-3.json")).uri().path(),
            "/secure-r/auth-3"
        );
    }

    #[tokio::test]
    async fn test_rewrite_happens_before_routing() {
        let app = Router::new()
            .route("/r/{name}", get(|| async { "registry" }))
            .route("/secure-r/{name}", get(|| async { "protected" }));
        let app = layer(EdgeRouter::new(RewriteStrategy::allowlist(["auth-3"]))).layer(app);

        let response = app.clone().oneshot(request("/r/auth-3.json")).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"protected");

        let response = app.oneshot(request("/r/auth-1.json")).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"registry");
    }
}
