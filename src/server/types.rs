use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub status: String,
    pub websocket: String,
    pub models_loaded: bool,
    pub active_connections: usize,
    pub text_model: String,
    pub image_model: String,
    pub loading_in_progress: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tutor_ready: bool,
    pub image_analyzer_ready: bool,
    pub websocket_endpoint: String,
    pub models_loaded: bool,
    pub loading_in_progress: bool,
    pub active_connections: usize,
    pub model_id: String,
    pub gpu_available: bool,
    pub gpu_name: String,
}
