mod types;

pub use types::*;

use crate::Result;
use std::{env, path::PathBuf, str::FromStr};
use tracing::{debug, warn};

/// Loads the YAML file named by `CONFIG_PATH` (default `config.yaml`), then
/// applies environment overrides. A missing file yields the defaults.
pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(config_str) => parse(&config_str)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Configuration file {} not found, using defaults and environment",
                config_path
            );
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };

    config.apply_overrides(|key| env::var(key).ok());
    Ok(config)
}

pub fn parse(config_str: &str) -> Result<Config> {
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(config_str)?)
}

impl Config {
    /// Overrides file values with variables returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = lookup("HF_MODEL_ID").or_else(|| lookup("TUTOR_MODEL_ID")) {
            self.model.model_id = id;
        }
        if let Some(token) = lookup("HF_TOKEN").or_else(|| lookup("HUGGINGFACE_HUB_TOKEN")) {
            self.model.token = Some(token);
        }
        if let Some(endpoint) = lookup("HF_ENDPOINT") {
            self.model.hub_endpoint = Some(endpoint);
        }
        if let Some(url) = lookup("INFERENCE_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(key) = lookup("INFERENCE_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(dir) = lookup("MODEL_CACHE_DIR") {
            self.model.cache_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_override("MAX_NEW_TOKENS", lookup("MAX_NEW_TOKENS")) {
            self.generation.max_new_tokens = v;
        }
        if let Some(v) = parse_override("TEMPERATURE", lookup("TEMPERATURE")) {
            self.generation.temperature = v;
        }
        if let Some(v) = parse_override("BACKEND_PORT", lookup("BACKEND_PORT")) {
            self.server.port = v;
        }
    }
}

fn parse_override<T: FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring unparseable {} override: {:?}", key, value);
            None
        }
    }
}
