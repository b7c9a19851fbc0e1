//! Admin API: read-only view of the lifecycle engine.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/generations", get(get_generations))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionConfig;
    use crate::lifecycle::{EngineSettings, LifecycleEngine};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Instant;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = ExecutionConfig::from_slice(br#"{ "version": "v1", "schema": {} }"#).unwrap();
        let state = AppState {
            engine: LifecycleEngine::start(config, EngineSettings::default()).unwrap(),
            admin_api_key: Arc::from("secret"),
            started_at: Instant::now(),
        };
        router(state.clone()).with_state(state)
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_key() {
        let response = app()
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(
                Request::get("/admin/status")
                    .header("authorization", "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lists_generations() {
        let response = app()
            .oneshot(
                Request::get("/admin/generations")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let generations: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(generations[0]["sequence"], 1);
        assert_eq!(generations[0]["version"], "v1");
        assert_eq!(generations[0]["status"], "active");
        assert_eq!(generations[0]["entity_types"], serde_json::json!([]));
    }
}
