use super::{GenerationRequest, InferenceProvider};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::debug;

/// An in-process model runtime whose calls block the calling thread.
pub trait BlockingEngine: Send + Sync + 'static {
    fn load(&self, model_id: &str) -> Result<()>;

    fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Runs a [`BlockingEngine`] on tokio's blocking pool so event handling
/// keeps running while the model works.
pub struct BlockingProvider<E> {
    engine: Arc<E>,
}

impl<E: BlockingEngine> BlockingProvider<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[async_trait]
impl<E: BlockingEngine> InferenceProvider for BlockingProvider<E> {
    async fn initialize(&self, model_id: &str) -> Result<()> {
        let engine = self.engine.clone();
        let model_id = model_id.to_string();
        task::spawn_blocking(move || engine.load(&model_id)).await?
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let engine = self.engine.clone();
        debug!("Dispatching generation to blocking pool");
        task::spawn_blocking(move || engine.generate(&request)).await?
    }
}
