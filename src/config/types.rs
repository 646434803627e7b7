use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model loaded when neither configuration nor the cache yields a usable id.
pub const DEFAULT_MODEL_ID: &str = "google/gemma-3n-e2b-it";

/// Placeholder shipped in sample env files; treated as "no token".
pub const PLACEHOLDER_TOKEN: &str = "your_hugging_face_token_here";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Hugging Face credential, only ever sent to the hub.
    #[serde(default)]
    pub token: Option<String>,
    /// Hub endpoint override; the public hub when unset.
    #[serde(default)]
    pub hub_endpoint: Option<String>,
    /// OpenAI-compatible endpoint of the local model server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer key for the model server, separate from the hub token.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_image_max_tokens")]
    pub image_max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

impl ModelConfig {
    /// The configured token, unless it is empty or the sample placeholder.
    pub fn usable_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != PLACEHOLDER_TOKEN)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            token: None,
            hub_endpoint: None,
            base_url: default_base_url(),
            api_key: None,
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            image_max_tokens: default_image_max_tokens(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_heartbeat_initial_delay(),
            interval_secs: default_heartbeat_interval(),
        }
    }
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/v1".to_string()
}

fn default_cache_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".cache/huggingface/hub"),
        None => PathBuf::from("./models_cache"),
    }
}

fn default_max_new_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_image_max_tokens() -> u32 {
    300
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_heartbeat_initial_delay() -> u64 {
    10
}

fn default_heartbeat_interval() -> u64 {
    25
}
