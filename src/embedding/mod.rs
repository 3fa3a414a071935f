//! Sentence embeddings: fetching the model into the local cache and running it.

mod fetch;
mod model;

use std::sync::Arc;

pub use fetch::{prefetch, ModelFiles, MODEL_FILES};
pub use model::SentenceEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::{BotError, Result};

/// Turns text into fixed-size vectors.
///
/// Implementations are CPU bound and blocking; async callers go through
/// [`embed_blocking`].
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}

/// Loads the cached model described by `config`.
pub fn load(config: &EmbeddingConfig) -> Result<SentenceEmbedder> {
    let files = ModelFiles::locate(config)?;
    SentenceEmbedder::load(&files, config.max_seq_len, config.normalize)
}

/// Runs [`Embedder::embed`] on the blocking thread pool.
pub async fn embed_blocking(embedder: Arc<dyn Embedder>, text: String) -> Result<Vec<f32>> {
    tokio::task::spawn_blocking(move || embedder.embed(&text))
        .await
        .map_err(|e| BotError::Embedding(format!("embedding task failed: {}", e)))?
}
