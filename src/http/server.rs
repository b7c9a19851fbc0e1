//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the front Axum router (health, admin, GraphQL fallback)
//! - Wire up middleware (tracing, request ID, timeout, limits)
//! - Hand each request to the active generation's pipeline
//! - Serve until the lifecycle token is cancelled
//!
//! # Design Decisions
//! - The front router never changes; generations swap underneath it
//! - A request holds its generation's in-flight slot until the response is
//!   produced, and unwinds with 503 if that generation is terminated

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceExt;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::RouterConfig;
use crate::health;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::lifecycle::{LifecycleEngine, LifecycleError};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub admin_api_key: Arc<str>,
    pub started_at: Instant,
}

/// HTTP front end of the router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &RouterConfig, engine: Arc<LifecycleEngine>) -> Self {
        let state = AppState {
            engine,
            admin_api_key: config.admin.api_key.as_str().into(),
            started_at: Instant::now(),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RouterConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health/live", get(health::live))
            .route("/health/ready", get(health::ready));
        if config.admin.enabled {
            router = router.merge(admin::router(state.clone()));
        }

        // Last layer added runs first.
        router
            .fallback(gateway_handler)
            .with_state(state)
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_in_flight))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = request.request_id().unwrap_or("-"),
                    )
                }),
            )
            .layer(set_request_id_layer())
    }

    /// The assembled router, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` is cancelled.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Runs every request that is not health or admin on the active generation.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();

    let admitted = match state.engine.acquire().await {
        Ok(admitted) => admitted,
        Err(e) => {
            let status = match e {
                LifecycleError::ShuttingDown | LifecycleError::NotAccepting => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(error = %e, "Request refused");
            metrics::record_request(&method, status.as_u16(), started);
            return unavailable(status, &e.to_string());
        }
    };

    let instance = Arc::clone(admitted.instance());
    let response = tokio::select! {
        biased;
        _ = instance.cancelled() => {
            tracing::warn!(
                generation = %instance.generation(),
                "Generation terminated while request was in flight"
            );
            unavailable(StatusCode::SERVICE_UNAVAILABLE, "generation terminated before the request completed")
        }
        result = instance.handler().oneshot(request) => match result {
            Ok(response) => response,
            Err(never) => match never {},
        },
    };
    drop(admitted);

    metrics::record_request(&method, response.status().as_u16(), started);
    response
}

fn unavailable(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "data": null,
        "errors": [{ "message": message, "extensions": { "code": "SERVICE_UNAVAILABLE" } }],
    });
    (status, Json(body)).into_response()
}
