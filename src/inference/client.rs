use super::types::*;
use crate::{Error, Result, config::ModelConfig};
use async_openai::{Client, config::OpenAIConfig, types as openai_types};
use async_trait::async_trait;
use std::sync::RwLock;
use tracing::{debug, info};

/// Turns a structured prompt into generated text. Calls may take seconds and
/// return the whole answer at once.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Loads or attaches to `model_id`. Generation is only valid afterwards.
    async fn initialize(&self, model_id: &str) -> Result<()>;

    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// Provider backed by a local model server speaking the OpenAI chat API.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: RwLock<Option<String>>,
}

impl OpenAiProvider {
    pub fn new(config: &ModelConfig) -> Self {
        let mut openai_config = OpenAIConfig::new();

        // The hub token stays with the hub; the model server gets its own key.
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            openai_config = openai_config.with_api_key(key);
        }

        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url.clone());
        }

        Self {
            client: Client::with_config(openai_config),
            model: RwLock::new(None),
        }
    }

    pub fn model(&self) -> Option<String> {
        self.model.read().ok().and_then(|m| m.clone())
    }
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    async fn initialize(&self, model_id: &str) -> Result<()> {
        debug!("Checking that model {} is served", model_id);

        let model = self.client.models().retrieve(model_id).await?;
        info!("Inference provider attached to model {}", model.id);

        let mut slot = self
            .model
            .write()
            .map_err(|_| Error::internal("model slot lock poisoned"))?;
        *slot = Some(model_id.to_string());
        Ok(())
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let model = self
            .model()
            .ok_or_else(|| Error::not_ready("Inference provider not initialized"))?;

        debug!(
            "Creating chat completion with {} messages, max_tokens {}",
            request.messages.len(),
            request.max_tokens
        );

        let mut messages = Vec::with_capacity(request.messages.len());
        for msg in &request.messages {
            messages.push(msg.to_openai_message()?);
        }

        let mut request_builder = openai_types::CreateChatCompletionRequestArgs::default();
        request_builder
            .model(model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        if let Some(top_p) = request.top_p {
            request_builder.top_p(top_p);
        }

        let openai_request = request_builder.build()?;
        let response = self.client.chat().create(openai_request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::inference("Model returned no content"))?;

        if let Some(usage) = response.usage {
            debug!(
                "Completion used {} prompt and {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(content.trim().to_string())
    }
}
