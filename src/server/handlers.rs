use super::types::{HealthResponse, IndexResponse};
use crate::{
    Result,
    accelerator::AcceleratorInfo,
    config::Config,
    events::EventBroadcaster,
    inference::InferenceProvider,
    model_state::{LoadPhase, ModelState},
    orchestrator::Orchestrator,
    session::SessionRegistry,
    vision::ImageLoader,
};
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::debug;

pub const WEBSOCKET_PATH: &str = "/ws";

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub broadcaster: EventBroadcaster,
    pub model_state: Arc<ModelState>,
    pub orchestrator: Arc<Orchestrator>,
    pub accelerator: AcceleratorInfo,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        config: &Config,
        accelerator: AcceleratorInfo,
    ) -> Result<Self> {
        let sessions = Arc::new(SessionRegistry::new());
        let broadcaster = EventBroadcaster::new(sessions.clone());
        let model_state = Arc::new(ModelState::new());
        let orchestrator = Arc::new(Orchestrator::new(
            provider,
            model_state.clone(),
            broadcaster.clone(),
            ImageLoader::new()?,
            config.generation.clone(),
        ));

        Ok(Self {
            sessions,
            broadcaster,
            model_state,
            orchestrator,
            accelerator,
        })
    }
}

fn phase_label(phase: LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Ready => "ready",
        LoadPhase::Unloaded | LoadPhase::Loading => "loading",
        LoadPhase::Failed => "failed",
    }
}

pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let phase = state.model_state.phase();
    let ready = phase == LoadPhase::Ready;

    Json(IndexResponse {
        status: "AI Tutor Backend Running".to_string(),
        websocket: format!("Connect to {}", WEBSOCKET_PATH),
        models_loaded: ready,
        active_connections: state.sessions.count(),
        text_model: phase_label(phase).to_string(),
        image_model: if ready { "ready" } else { "unavailable" }.to_string(),
        loading_in_progress: phase == LoadPhase::Loading,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.model_state.snapshot();
    let ready = status.phase == LoadPhase::Ready;
    debug!("Health check: {:?}", status.phase);

    Json(HealthResponse {
        status: match status.phase {
            LoadPhase::Ready => "healthy",
            LoadPhase::Unloaded | LoadPhase::Loading => "loading",
            LoadPhase::Failed => "failed",
        }
        .to_string(),
        tutor_ready: ready,
        image_analyzer_ready: ready,
        websocket_endpoint: WEBSOCKET_PATH.to_string(),
        models_loaded: ready,
        loading_in_progress: status.phase == LoadPhase::Loading,
        active_connections: state.sessions.count(),
        model_id: status.model_id.unwrap_or_else(|| "unknown".to_string()),
        gpu_available: state.accelerator.available,
        gpu_name: state.accelerator.display_name().to_string(),
    })
}
