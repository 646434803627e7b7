pub mod fsm;

pub use fsm::{RequestEvent, RequestLifecycle, RequestPhase};

use crate::{
    config::GenerationConfig,
    events::{ErrorContext, EventBroadcaster, ImageQuestion, ServerEvent, TutorRequest},
    inference::InferenceProvider,
    model_state::{LoadPhase, ModelState},
    tutor::{GenerationOptions, build_image_request},
    vision::ImageLoader,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const TEXT_LOADING_MESSAGE: &str = "AI models are still loading.";
const TEXT_FAILED_MESSAGE: &str = "AI models failed to load. Restart the server to retry.";
const IMAGE_UNAVAILABLE_MESSAGE: &str =
    "Image analysis is not available. Running in text-only mode.";

/// Drives one client request from admission to its final event.
///
/// Text requests always end with `text_response_start`, `text_response_chunk`
/// and `text_response_complete` sharing one id, unless the model is not
/// ready (single `error` event) or the client is gone. Provider failures on
/// the text path become the chunk's content; on the image path they become an
/// `error` event tagged `image-analyzer`.
pub struct Orchestrator {
    provider: Arc<dyn InferenceProvider>,
    model_state: Arc<ModelState>,
    broadcaster: EventBroadcaster,
    images: ImageLoader,
    generation: GenerationConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        model_state: Arc<ModelState>,
        broadcaster: EventBroadcaster,
        images: ImageLoader,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            model_state,
            broadcaster,
            images,
            generation,
        }
    }

    pub async fn handle_text(&self, session_id: &str, request: TutorRequest) -> RequestLifecycle {
        let request_id = Uuid::new_v4().to_string();
        let mut lifecycle = RequestLifecycle::new(&request_id);

        info!(
            "Text request {} from session {} ({} chars)",
            request_id,
            session_id,
            request.message.len()
        );

        let phase = self.model_state.phase();
        if phase != LoadPhase::Ready {
            warn!(
                "Rejecting text request {}: model state {:?}",
                request_id, phase
            );
            let message = if phase == LoadPhase::Failed {
                TEXT_FAILED_MESSAGE
            } else {
                TEXT_LOADING_MESSAGE
            };
            advance(&mut lifecycle, RequestEvent::Rejected);
            self.emit(
                session_id,
                ServerEvent::error(message, ErrorContext::TextTutor),
            );
            return lifecycle;
        }
        advance(&mut lifecycle, RequestEvent::Admitted);

        let options = GenerationOptions::from_settings(&request.settings, &self.generation);
        debug!(
            "Request {} options: subject={}, language={}, level={:?}, style={}, max_tokens={}",
            request_id,
            options.subject,
            options.language,
            options.level,
            options.style.label(),
            options.max_tokens
        );

        if !self.emit(session_id, ServerEvent::text_start(&request_id)) {
            advance(&mut lifecycle, RequestEvent::DeliveryFailed);
            return lifecycle;
        }

        let prompt = options.build_request(&request.message, &self.generation);
        advance(&mut lifecycle, RequestEvent::Dispatched);

        let started = Instant::now();
        let content = match self.provider.generate(prompt).await {
            Ok(answer) => {
                info!(
                    "Request {} answered in {:.2}s ({} chars)",
                    request_id,
                    started.elapsed().as_secs_f64(),
                    answer.len()
                );
                answer
            }
            Err(e) => {
                error!("Generation failed for request {}: {}", request_id, e);
                format!("Error generating response: {}", e)
            }
        };

        if !self.emit(session_id, ServerEvent::text_chunk(&request_id, content))
            || !self.emit(session_id, ServerEvent::text_complete(&request_id))
        {
            advance(&mut lifecycle, RequestEvent::DeliveryFailed);
            return lifecycle;
        }

        advance(&mut lifecycle, RequestEvent::Answered);
        lifecycle
    }

    pub async fn handle_image(
        &self,
        session_id: &str,
        request: ImageQuestion,
    ) -> RequestLifecycle {
        let request_id = Uuid::new_v4().to_string();
        let mut lifecycle = RequestLifecycle::new(&request_id);

        info!(
            "Image request {} from session {}: {}",
            request_id,
            session_id,
            request.question.chars().take(50).collect::<String>()
        );

        if !self.model_state.is_ready() {
            warn!("Rejecting image request {}: model not ready", request_id);
            advance(&mut lifecycle, RequestEvent::Rejected);
            self.emit(
                session_id,
                ServerEvent::error(IMAGE_UNAVAILABLE_MESSAGE, ErrorContext::ImageAnalyzer),
            );
            return lifecycle;
        }
        advance(&mut lifecycle, RequestEvent::Admitted);

        if !self.emit(session_id, ServerEvent::image_start(session_id)) {
            advance(&mut lifecycle, RequestEvent::DeliveryFailed);
            return lifecycle;
        }

        let image = match self.images.load(&request.image_url).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Image request {} has unusable input: {}", request_id, e);
                advance(&mut lifecycle, RequestEvent::Rejected);
                self.emit(
                    session_id,
                    ServerEvent::error(
                        format!("Error analyzing image: {}", e),
                        ErrorContext::ImageAnalyzer,
                    ),
                );
                return lifecycle;
            }
        };
        debug!(
            "Request {} image decoded: {}x{}",
            request_id, image.width, image.height
        );

        let prompt = build_image_request(image.to_data_url(), &request.question, &self.generation);
        advance(&mut lifecycle, RequestEvent::Dispatched);

        let started = Instant::now();
        match self.provider.generate(prompt).await {
            Ok(answer) => {
                info!(
                    "Image request {} answered in {:.2}s",
                    request_id,
                    started.elapsed().as_secs_f64()
                );
                if self.emit(session_id, ServerEvent::image_result(answer, session_id)) {
                    advance(&mut lifecycle, RequestEvent::Answered);
                } else {
                    advance(&mut lifecycle, RequestEvent::DeliveryFailed);
                }
            }
            Err(e) => {
                error!("Image analysis failed for request {}: {}", request_id, e);
                advance(&mut lifecycle, RequestEvent::InferenceFailed);
                self.emit(
                    session_id,
                    ServerEvent::error(
                        format!("Error analyzing image: {}", e),
                        ErrorContext::ImageAnalyzer,
                    ),
                );
            }
        }

        lifecycle
    }

    /// Delivers to the originating session; failures are logged, not raised.
    fn emit(&self, session_id: &str, event: ServerEvent) -> bool {
        let name = event.name();
        match self.broadcaster.send_to(session_id, event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping {} for session {}: {}", name, session_id, e);
                false
            }
        }
    }
}

fn advance(lifecycle: &mut RequestLifecycle, event: RequestEvent) {
    if let Err(e) = lifecycle.transition(event) {
        error!("Request {}: {}", lifecycle.request_id(), e);
    }
}
