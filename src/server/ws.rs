use super::handlers::AppState;
use crate::{
    events::{ClientEvent, ErrorContext, ServerEvent},
    orchestrator::RequestLifecycle,
};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    state.sessions.register(&session_id, tx);
    info!(
        "Client connected: {} ({} active)",
        session_id,
        state.sessions.count()
    );

    let greeting = ServerEvent::connection_established(&session_id, state.model_state.is_ready());
    if let Err(e) = state.broadcaster.send_to(&session_id, greeting) {
        warn!("Could not greet session {}: {}", session_id, e);
    }

    let writer_id = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to serialize {}: {}", event.name(), e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(frame)).await {
                debug!("Socket for session {} closed: {}", writer_id, e);
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_client_frame(&state, &session_id, &text);
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Receive error on session {}: {}", session_id, e);
                break;
            }
        }
    }

    let messages = state.sessions.unregister(&session_id).unwrap_or_default();
    writer.abort();
    info!(
        "Client disconnected: {} after {} messages ({} active)",
        session_id,
        messages,
        state.sessions.count()
    );
}

/// Dispatches one inbound frame. Tutor and image requests run on their own
/// task so the reader keeps draining the socket; the handle is returned for
/// callers that want to await the outcome.
pub fn handle_client_frame(
    state: &AppState,
    session_id: &str,
    text: &str,
) -> Option<JoinHandle<RequestLifecycle>> {
    state.sessions.touch(session_id);

    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Unparseable frame from session {}: {}", session_id, e);
            let reply = ServerEvent::error(format!("Invalid message: {}", e), ErrorContext::Protocol);
            if let Err(e) = state.broadcaster.send_to(session_id, reply) {
                debug!("Could not report protocol error: {}", e);
            }
            return None;
        }
    };

    match event {
        ClientEvent::AskAiTutor(request) => {
            let orchestrator = state.orchestrator.clone();
            let session_id = session_id.to_string();
            Some(tokio::spawn(async move {
                orchestrator.handle_text(&session_id, request).await
            }))
        }
        ClientEvent::AskImageQuestion(request) => {
            let orchestrator = state.orchestrator.clone();
            let session_id = session_id.to_string();
            Some(tokio::spawn(async move {
                orchestrator.handle_image(&session_id, request).await
            }))
        }
        ClientEvent::Ping(_) => {
            if let Err(e) = state
                .broadcaster
                .send_to(session_id, ServerEvent::pong(session_id))
            {
                debug!("Could not answer ping: {}", e);
            }
            None
        }
    }
}
