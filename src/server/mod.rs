mod handlers;
mod types;
mod ws;

pub use handlers::{AppState, WEBSOCKET_PATH};
pub use types::{HealthResponse, IndexResponse};
pub use ws::handle_client_frame;

use crate::{
    Result, accelerator, bootstrap,
    config::Config,
    events::{HeartbeatSchedule, spawn_heartbeat},
    hub::HubDownloader,
    inference::{InferenceProvider, OpenAiProvider},
};
use axum::{Router, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(WEBSOCKET_PATH, get(ws::upgrade))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    let provider: Arc<dyn InferenceProvider> = Arc::new(OpenAiProvider::new(&config.model));
    let app_state = AppState::new(provider.clone(), &config, accelerator::detect())?;

    let cancel = CancellationToken::new();
    let heartbeat = spawn_heartbeat(
        app_state.broadcaster.clone(),
        app_state.model_state.clone(),
        HeartbeatSchedule::from(&config.server.heartbeat),
        cancel.clone(),
    );

    let loader = {
        let config = config.clone();
        let model_state = app_state.model_state.clone();
        let broadcaster = app_state.broadcaster.clone();
        let downloader = HubDownloader::new(&config.model);
        tokio::spawn(async move {
            match bootstrap::run(&config, provider, &downloader, model_state, broadcaster).await {
                Ok(model_id) => info!("Model {} ready", model_id),
                Err(e) => error!("Model bootstrap failed, running degraded: {}", e),
            }
        })
    };

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Starting server on {}", addr);
    info!("WebSocket endpoint: ws://{}{}", addr, WEBSOCKET_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    loader.abort();
    match heartbeat.await {
        Ok(beats) => info!("Server stopped after {} heartbeats", beats),
        Err(e) => warn!("Heartbeat task ended abnormally: {}", e),
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
