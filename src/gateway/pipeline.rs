//! Per-instance GraphQL handler pipeline.
//!
//! # Responsibilities
//! - Serve `POST /graphql` for one generation
//! - Route `_entities` requests to the generation's dispatcher
//! - Answer `_service { sdl }` from the generation's merged schema
//! - Stamp every response with the generation that produced it
//!
//! # Data Flow
//! ```text
//! {query, variables.representations, extensions.entityErrorPolicy}
//!     → EntityDispatcher::dispatch_batch
//!     → apply_policy
//!     → {"data": {"_entities": [...]}, "errors": [{path: ["_entities", i]}]}
//! ```

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::federation::{apply_policy, EntityDispatcher, EntityError, ErrorPolicy};

/// Response header naming the generation that served the request.
pub const GENERATION_HEADER: HeaderName = HeaderName::from_static("x-router-generation");

const REPRESENTATIONS: &str = "representations";
const ERROR_POLICY_EXTENSION: &str = "entityErrorPolicy";

#[derive(Debug, Clone)]
pub struct PipelineState {
    generation: Arc<str>,
    dispatcher: Arc<EntityDispatcher>,
    sdl: Arc<str>,
}

impl PipelineState {
    pub fn new(generation: String, dispatcher: Arc<EntityDispatcher>, sdl: String) -> Self {
        Self {
            generation: generation.into(),
            dispatcher,
            sdl: sdl.into(),
        }
    }
}

/// A GraphQL-over-HTTP request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

pub fn router(state: PipelineState) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<PipelineState>,
    payload: Result<Json<GraphQLRequest>, JsonRejection>,
) -> Response {
    let mut request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let body = error_body(rejection.body_text(), "BAD_REQUEST");
            return respond(&state, rejection.status(), body);
        }
    };

    tracing::debug!(
        generation = %state.generation,
        operation = request.operation_name.as_deref().unwrap_or(""),
        "GraphQL request"
    );

    if let Some(representations) = request.variables.remove(REPRESENTATIONS) {
        let policy = match request.extensions.get(ERROR_POLICY_EXTENSION) {
            None => ErrorPolicy::default(),
            Some(raw) => match serde_json::from_value(raw.clone()) {
                Ok(policy) => policy,
                Err(_) => {
                    let body = error_body(
                        format!("unsupported {ERROR_POLICY_EXTENSION} `{raw}`"),
                        "BAD_USER_INPUT",
                    );
                    return respond(&state, StatusCode::OK, body);
                }
            },
        };
        let body = resolve_entities(&state.dispatcher, representations, policy).await;
        return respond(&state, StatusCode::OK, body);
    }

    if request.query.contains("_service") {
        let body = json!({ "data": { "_service": { "sdl": &*state.sdl } } });
        return respond(&state, StatusCode::OK, body);
    }

    let body = error_body(
        "only _entities and _service operations are supported".to_string(),
        "OPERATION_NOT_SUPPORTED",
    );
    respond(&state, StatusCode::OK, body)
}

async fn resolve_entities(
    dispatcher: &EntityDispatcher,
    representations: Value,
    policy: ErrorPolicy,
) -> Value {
    let Value::Array(representations) = representations else {
        return error_body(
            format!("variables.{REPRESENTATIONS} must be a list"),
            "BAD_USER_INPUT",
        );
    };

    let results = dispatcher.dispatch_batch(representations).await;
    match apply_policy(results, policy) {
        Ok(results) => {
            let mut entities = Vec::with_capacity(results.len());
            let mut errors = Vec::new();
            for (index, result) in results.into_iter().enumerate() {
                match result {
                    Ok(entity) => entities.push(entity.into_value()),
                    Err(e) => {
                        entities.push(Value::Null);
                        errors.push(entity_error(index, &e));
                    }
                }
            }

            let mut body = json!({ "data": { "_entities": entities } });
            if !errors.is_empty() {
                body["errors"] = Value::Array(errors);
            }
            body
        }
        Err((index, e)) => json!({ "data": null, "errors": [entity_error(index, &e)] }),
    }
}

fn entity_error(index: usize, error: &EntityError) -> Value {
    json!({
        "message": error.to_string(),
        "path": ["_entities", index],
        "extensions": { "code": error.code() },
    })
}

fn error_body(message: String, code: &str) -> Value {
    json!({ "data": null, "errors": [{ "message": message, "extensions": { "code": code } }] })
}

fn respond(state: &PipelineState, status: StatusCode, body: Value) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&state.generation) {
        response.headers_mut().insert(GENERATION_HEADER, value);
    }
    response
}
