use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tutor_server::{
    Error, Result,
    hub::ModelFetcher,
    inference::{GenerationRequest, InferenceProvider},
};

use super::test_utils::seed_cache;

/// Mock inference provider for testing
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
    pub initialized: Arc<Mutex<Vec<String>>>,
    pub response: String,
    pub error: Option<String>,
    pub initialize_error: Option<String>,
    pub delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            initialized: Arc::new(Mutex::new(Vec::new())),
            response: "Osmosis is the movement of water across a membrane.".to_string(),
            error: None,
            initialize_error: None,
            delay: None,
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_initialize_error(mut self, error: &str) -> Self {
        self.initialize_error = Some(error.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn initialized_models(&self) -> Vec<String> {
        self.initialized.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    async fn initialize(&self, model_id: &str) -> Result<()> {
        if let Some(ref error) = self.initialize_error {
            return Err(Error::inference(error.clone()));
        }
        self.initialized.lock().unwrap().push(model_id.to_string());
        Ok(())
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let question = request.question().unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(ref error) = self.error {
            return Err(Error::inference(error.clone()));
        }

        if self.response.contains("{question}") {
            return Ok(self.response.replace("{question}", &question));
        }
        Ok(self.response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock hub fetcher that seeds the cache instead of downloading
#[derive(Debug, Clone)]
pub struct MockFetcher {
    pub cache_dir: PathBuf,
    pub fetched: Arc<Mutex<Vec<String>>>,
    pub error: Option<String>,
}

impl MockFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            fetched: Arc::new(Mutex::new(Vec::new())),
            error: None,
        }
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn fetched_models(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelFetcher for MockFetcher {
    async fn fetch(&self, model_id: &str) -> Result<PathBuf> {
        self.fetched.lock().unwrap().push(model_id.to_string());

        if let Some(ref error) = self.error {
            return Err(Error::config(error.clone()));
        }
        Ok(seed_cache(&self.cache_dir, model_id, "downloaded"))
    }
}
