use axum::{extract::State, Json};
use serde::Serialize;

use crate::gateway::{InstanceStatus, RouterInstance};
use crate::http::AppState;
use crate::lifecycle::EngineState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub state: EngineState,
    pub uptime_secs: u64,
    pub active: GenerationStatus,
    pub draining: usize,
}

#[derive(Debug, Serialize)]
pub struct GenerationStatus {
    pub sequence: u64,
    pub config_id: String,
    pub version: Option<String>,
    pub status: InstanceStatus,
    pub in_flight: u64,
    /// Entity types this generation resolves, sorted.
    pub entity_types: Vec<String>,
    /// Subgraph names from the generation's execution config.
    pub subgraphs: Vec<String>,
    pub age_secs: u64,
}

impl GenerationStatus {
    fn of(instance: &RouterInstance) -> Self {
        let generation = instance.generation();
        Self {
            sequence: generation.sequence,
            config_id: generation.config_id.to_string(),
            version: generation.version.clone(),
            status: instance.status(),
            in_flight: instance.in_flight(),
            entity_types: instance
                .dispatcher()
                .table()
                .typenames()
                .into_iter()
                .map(str::to_string)
                .collect(),
            subgraphs: instance
                .config()
                .subgraphs()
                .iter()
                .map(|subgraph| subgraph.name.clone())
                .collect(),
            age_secs: instance.age().as_secs(),
        }
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        state: state.engine.state(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        active: GenerationStatus::of(&state.engine.active()),
        draining: state.engine.draining().len(),
    })
}

/// Active generation first, then draining ones oldest first.
pub async fn get_generations(State(state): State<AppState>) -> Json<Vec<GenerationStatus>> {
    let mut generations = vec![GenerationStatus::of(&state.engine.active())];
    generations.extend(
        state
            .engine
            .draining()
            .iter()
            .map(|instance| GenerationStatus::of(instance)),
    );
    Json(generations)
}
