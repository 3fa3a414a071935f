use std::path::PathBuf;

use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Cache, Repo, RepoType};
use tracing::{info, warn};

use crate::config::EmbeddingConfig;
use crate::error::{BotError, Result};

/// Files required to run a sentence-transformers BERT model.
pub const MODEL_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Local paths of a cached embedding model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    fn from_paths(mut paths: Vec<PathBuf>) -> Result<Self> {
        if paths.len() != MODEL_FILES.len() {
            return Err(BotError::Embedding(format!(
                "expected {} model files, got {}",
                MODEL_FILES.len(),
                paths.len()
            )));
        }
        let weights = paths.remove(2);
        let tokenizer = paths.remove(1);
        let config = paths.remove(0);
        Ok(Self { config, tokenizer, weights })
    }

    /// Finds the model in the local cache without touching the network.
    ///
    /// On a miss, downloads the files when `allow_download` is set and fails
    /// with [`BotError::ModelNotCached`] otherwise.
    pub fn locate(config: &EmbeddingConfig) -> Result<Self> {
        let cache = Cache::new(config.cache_dir.clone());
        let repo = cache.repo(repo(config));

        let mut paths = Vec::with_capacity(MODEL_FILES.len());
        for file in MODEL_FILES {
            match repo.get(file) {
                Some(path) => paths.push(path),
                None if config.allow_download => {
                    warn!("{} missing from model cache, downloading", file);
                    return prefetch(config);
                }
                None => {
                    return Err(BotError::ModelNotCached {
                        model_id: config.model_id.clone(),
                        file: file.to_string(),
                        cache_dir: config.cache_dir.display().to_string(),
                    })
                }
            }
        }
        Self::from_paths(paths)
    }
}

fn repo(config: &EmbeddingConfig) -> Repo {
    Repo::with_revision(
        config.model_id.clone(),
        RepoType::Model,
        config.revision.clone(),
    )
}

/// Downloads the embedding model into the configured cache directory.
///
/// Files already present in the cache are reused, so running this twice is cheap.
/// Blocking; call it before the runtime starts or from `spawn_blocking`.
pub fn prefetch(config: &EmbeddingConfig) -> Result<ModelFiles> {
    info!(
        "Fetching {}@{} into {}",
        config.model_id,
        config.revision,
        config.cache_dir.display()
    );

    let api = ApiBuilder::new()
        .with_endpoint(config.hub_url.trim_end_matches('/').to_string())
        .with_cache_dir(config.cache_dir.clone())
        .with_progress(false)
        .build()
        .map_err(|e| BotError::Embedding(format!("failed to initialise model hub client: {}", e)))?;
    let api_repo = api.repo(repo(config));

    let mut paths = Vec::with_capacity(MODEL_FILES.len());
    for file in MODEL_FILES {
        let path = api_repo
            .get(file)
            .map_err(|e| BotError::Embedding(format!("failed to fetch {}: {}", file, e)))?;
        info!("Cached {} at {}", file, path.display());
        paths.push(path);
    }

    ModelFiles::from_paths(paths)
}
