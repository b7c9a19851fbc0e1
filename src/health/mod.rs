//! Liveness and readiness endpoints.
//!
//! # States
//! ```text
//! live:  200 while the process runs
//! ready: 200 while the engine is Serving or Reloading
//!        503 while Initializing, Draining, Stopped or Fatal
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::http::AppState;
use crate::lifecycle::EngineState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub state: EngineState,
    pub generation: String,
}

pub async fn live() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let engine_state = state.engine.state();
    let status = if engine_state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(Readiness {
            state: engine_state,
            generation: state.engine.active().generation().label(),
        }),
    )
}
