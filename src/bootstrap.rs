//! One-shot model bootstrap, run alongside the listener. Requests are
//! rejected as not-ready until it finishes; if it fails the server stays up
//! in degraded mode.

use crate::{
    Error, Result,
    config::{Config, DEFAULT_MODEL_ID, ModelConfig},
    events::EventBroadcaster,
    hub::{self, ModelFetcher},
    inference::InferenceProvider,
    model_state::ModelState,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

const READY_NOTICE_DELAY: Duration = Duration::from_secs(2);

/// Returns the configured id if its snapshot is present in the cache.
pub fn resolve_model_id(model: &ModelConfig) -> Result<String> {
    let model_id = model.model_id.trim();
    if model_id.is_empty() {
        return Err(Error::config("model id is empty"));
    }

    match hub::cached_snapshot(&model.cache_dir, model_id) {
        Some(snapshot) => {
            info!("Found cached model {} at {}", model_id, snapshot.display());
            Ok(model_id.to_string())
        }
        None => Err(Error::config(format!(
            "model {} not found in cache {}",
            model_id,
            model.cache_dir.display()
        ))),
    }
}

/// Cached id, else a fresh download of it, else the default id.
async fn ensure_model_available(
    model: &ModelConfig,
    fetcher: &dyn ModelFetcher,
    broadcaster: &EventBroadcaster,
) -> String {
    let miss = match resolve_model_id(model) {
        Ok(id) => {
            broadcaster.loading_status(format!("Model found: {}", id));
            return id;
        }
        Err(e) => e,
    };

    let requested = model.model_id.trim();
    if !requested.is_empty() {
        info!("{}; downloading", miss);
        broadcaster.loading_status(format!("Downloading model {}...", requested));
        match fetcher.fetch(requested).await {
            Ok(snapshot) => {
                info!("Model {} downloaded to {}", requested, snapshot.display());
                broadcaster.loading_status(format!("Model downloaded: {}", requested));
                return requested.to_string();
            }
            Err(e) => warn!("Download of {} failed: {}", requested, e),
        }
    }

    warn!("Falling back to {}", DEFAULT_MODEL_ID);
    broadcaster.loading_status("Using cached model directly...");
    DEFAULT_MODEL_ID.to_string()
}

/// Resolves the model and initializes the provider, reporting progress to
/// every connected client. Returns the loaded id.
pub async fn run(
    config: &Config,
    provider: Arc<dyn InferenceProvider>,
    fetcher: &dyn ModelFetcher,
    model_state: Arc<ModelState>,
    broadcaster: EventBroadcaster,
) -> Result<String> {
    if let Err(e) = model_state.begin_loading() {
        warn!("Model loading already started, ignoring bootstrap: {}", e);
        return Err(e);
    }

    broadcaster.loading_status("Starting AI Tutor Backend...");
    broadcaster.loading_status("Configuration loaded...");

    if config.model.usable_token().is_some() {
        broadcaster.loading_status("Access token configured...");
    } else {
        warn!("No hub access token configured; gated models cannot be downloaded");
        broadcaster.loading_status("No access token configured, using public or cached models...");
    }

    broadcaster.loading_status("Checking cached models...");
    let model_id = ensure_model_available(&config.model, fetcher, &broadcaster).await;
    model_state.set_model_id(&model_id);

    broadcaster.loading_status("Loading AI Tutor model...");
    if let Err(e) = provider.initialize(&model_id).await {
        error!("Failed to initialize model {}: {}", model_id, e);
        broadcaster.loading_status(format!("Model loading failed: {}", e));
        if let Err(state_err) = model_state.mark_failed(e.to_string()) {
            error!("Could not record load failure: {}", state_err);
        }
        return Err(e);
    }
    broadcaster.loading_status("AI Tutor loaded successfully!");
    broadcaster.loading_status("Image Analyzer ready!");

    model_state.mark_ready(&model_id)?;
    info!("All models initialized: {}", model_id);
    broadcaster.loading_status("All AI models loaded! Ready to chat!");

    let notice = broadcaster.clone();
    tokio::spawn(async move {
        tokio::time::sleep(READY_NOTICE_DELAY).await;
        notice.loading_status("AI Tutor is ready for questions!");
    });

    Ok(model_id)
}
