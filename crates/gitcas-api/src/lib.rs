//! # gitcas-api: HTTP Surface
//!
//! Axum router over an [`AssetStore`](gitcas_store::AssetStore).
//!
//! ## Routes
//!
//! - `POST /v1/assets`: upload from a source string
//! - `POST /v1/assets/raw`: upload the request body
//! - `GET  /v1/assets/{hash}`: look up a committed asset
//! - `GET  /v1/stats`: aggregate statistics
//! - `/health/*`: liveness and readiness probes
//!
//! Handlers hold no logic of their own; every error maps to a structured
//! JSON response via [`AppError`].

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Largest accepted request body: 64 MiB.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::assets::router())
        .merge(routes::stats::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the batch loop is running and the metadata store
/// answers. Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if !state.store.is_active() {
        return (StatusCode::SERVICE_UNAVAILABLE, "batch processor not running".to_string())
            .into_response();
    }
    if let Err(e) = state.store.stats().await {
        tracing::warn!("metadata health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "metadata store unreachable".to_string())
            .into_response();
    }
    (StatusCode::OK, "ready".to_string()).into_response()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_text, Fixture};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn liveness_is_ok() {
        let fx = Fixture::inactive();
        let req = Request::builder()
            .uri("/health/liveness")
            .body(Body::empty())
            .unwrap();
        let resp = fx.app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "ok");
    }

    #[tokio::test]
    async fn readiness_requires_running_loop() {
        let fx = Fixture::inactive();
        let req = Request::builder()
            .uri("/health/readiness")
            .body(Body::empty())
            .unwrap();
        let resp = fx.app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readiness_ok_when_active() {
        let fx = Fixture::active();
        let req = Request::builder()
            .uri("/health/readiness")
            .body(Body::empty())
            .unwrap();
        let resp = fx.app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "ready");
        fx.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let fx = Fixture::inactive();
        let req = Request::builder().uri("/v2/nothing").body(Body::empty()).unwrap();
        let resp = fx.app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
