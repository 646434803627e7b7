use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tutor_server::{
    config::{Config, GenerationConfig, ModelConfig},
    events::{EventBroadcaster, ServerEvent},
    hub::MARKER_FILE,
    inference::InferenceProvider,
    model_state::ModelState,
    orchestrator::Orchestrator,
    session::{EventReceiver, SessionRegistry},
    vision::ImageLoader,
};

/// Config pointing at a throwaway cache directory.
pub fn test_config(cache_dir: &Path) -> Config {
    Config {
        model: ModelConfig {
            model_id: "org/tiny-tutor".to_string(),
            base_url: "http://127.0.0.1:9/v1".to_string(),
            cache_dir: cache_dir.to_path_buf(),
            ..Default::default()
        },
        generation: GenerationConfig::default(),
        ..Default::default()
    }
}

pub fn ready_state(model_id: &str) -> Arc<ModelState> {
    let state = Arc::new(ModelState::new());
    state.begin_loading().unwrap();
    state.mark_ready(model_id).unwrap();
    state
}

pub fn failed_state(reason: &str) -> Arc<ModelState> {
    let state = Arc::new(ModelState::new());
    state.begin_loading().unwrap();
    state.mark_failed(reason).unwrap();
    state
}

pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub broadcaster: EventBroadcaster,
    pub orchestrator: Orchestrator,
}

pub fn harness(provider: Arc<dyn InferenceProvider>, model_state: Arc<ModelState>) -> Harness {
    let registry = Arc::new(SessionRegistry::new());
    let broadcaster = EventBroadcaster::new(registry.clone());
    let orchestrator = Orchestrator::new(
        provider,
        model_state,
        broadcaster.clone(),
        ImageLoader::new().unwrap(),
        GenerationConfig::default(),
    );
    Harness {
        registry,
        broadcaster,
        orchestrator,
    }
}

/// Registers a session and returns the receiving end of its channel.
pub fn connect(registry: &SessionRegistry, session_id: &str) -> EventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    assert!(registry.register(session_id, tx));
    rx
}

/// Everything queued for the session so far.
pub fn drain(rx: &mut EventReceiver) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn event_names(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(ServerEvent::name).collect()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

pub fn png_data_url(width: u32, height: u32) -> String {
    use base64::{Engine, engine::general_purpose::STANDARD};
    format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(width, height)))
}

/// Lays out a hub cache entry for `model_id` checked out at `revision`.
pub fn seed_cache(cache_dir: &Path, model_id: &str, revision: &str) -> PathBuf {
    let repo = cache_dir.join(format!("models--{}", model_id.replace('/', "--")));
    let snapshot = repo.join("snapshots").join(revision);
    std::fs::create_dir_all(&snapshot).unwrap();
    std::fs::create_dir_all(repo.join("refs")).unwrap();
    std::fs::write(repo.join("refs/main"), revision).unwrap();
    std::fs::write(snapshot.join(MARKER_FILE), "{}").unwrap();
    snapshot
}
