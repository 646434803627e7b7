//! Hugging Face hub access: the local snapshot cache and downloads into it.

use crate::{Error, Result, config::ModelConfig};
use async_trait::async_trait;
use hf_hub::{Cache, Repo, api::tokio::ApiBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Present in every transformers checkpoint; marks a usable snapshot.
pub const MARKER_FILE: &str = "config.json";

/// Snapshot directory of `model_id` if the cache holds a complete checkout
/// of its `main` ref.
pub fn cached_snapshot(cache_dir: &Path, model_id: &str) -> Option<PathBuf> {
    let marker = Cache::new(cache_dir.to_path_buf())
        .repo(Repo::model(model_id.to_string()))
        .get(MARKER_FILE)?;
    marker.parent().map(Path::to_path_buf)
}

/// Brings a model into the local cache.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    /// Downloads every file of `model_id` and returns its snapshot directory.
    async fn fetch(&self, model_id: &str) -> Result<PathBuf>;
}

/// Fetches repositories from the hub with the configured credential.
#[derive(Debug, Clone)]
pub struct HubDownloader {
    cache_dir: PathBuf,
    token: Option<String>,
    endpoint: Option<String>,
}

impl HubDownloader {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            token: config.usable_token().map(str::to_string),
            endpoint: config.hub_endpoint.clone(),
        }
    }
}

#[async_trait]
impl ModelFetcher for HubDownloader {
    async fn fetch(&self, model_id: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let mut builder = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_token(self.token.clone())
            .with_progress(false);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        let api = builder.build()?;
        let repo = api.model(model_id.to_string());

        let repo_info = repo.info().await?;
        info!(
            "Downloading {} files of {} at revision {}",
            repo_info.siblings.len(),
            model_id,
            repo_info.sha
        );

        let mut snapshot = None;
        for sibling in &repo_info.siblings {
            let local = repo.get(&sibling.rfilename).await?;
            debug!("Fetched {} -> {}", sibling.rfilename, local.display());
            if snapshot.is_none() {
                let depth = Path::new(&sibling.rfilename).components().count();
                snapshot = local.ancestors().nth(depth).map(Path::to_path_buf);
            }
        }

        snapshot.ok_or_else(|| Error::config(format!("repository {} has no files", model_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seed(cache_dir: &Path, folder: &str, revision: &str) -> PathBuf {
        let repo = cache_dir.join(folder);
        let snapshot = repo.join("snapshots").join(revision);
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::create_dir_all(repo.join("refs")).unwrap();
        std::fs::write(repo.join("refs/main"), revision).unwrap();
        std::fs::write(snapshot.join(MARKER_FILE), "{}").unwrap();
        snapshot
    }

    #[test]
    fn test_cached_snapshot_follows_main_ref() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = seed(dir.path(), "models--org--tiny", "abc123");

        assert_eq!(cached_snapshot(dir.path(), "org/tiny"), Some(snapshot));
    }

    #[test]
    fn test_snapshot_without_marker_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = seed(dir.path(), "models--org--tiny", "abc123");
        std::fs::remove_file(snapshot.join(MARKER_FILE)).unwrap();

        assert_eq!(cached_snapshot(dir.path(), "org/tiny"), None);
    }

    #[test]
    fn test_other_models_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "models--org--tiny", "abc123");

        assert_eq!(cached_snapshot(dir.path(), "org/other"), None);
    }

    #[test]
    fn test_downloader_ignores_placeholder_token() {
        let config = ModelConfig {
            token: Some(crate::config::PLACEHOLDER_TOKEN.to_string()),
            hub_endpoint: Some("http://mirror.local".to_string()),
            ..Default::default()
        };
        let downloader = HubDownloader::new(&config);
        assert_eq!(downloader.token, None);
        assert_eq!(downloader.endpoint.as_deref(), Some("http://mirror.local"));
    }
}
