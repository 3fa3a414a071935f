mod memory;
mod pinecone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use pinecone::PineconeStore;

use crate::error::Result;

/// Metadata stored next to every knowledge vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// A vector ready to be written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: DocumentMetadata,
}

/// A retrieved document with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub score: f32,
}

/// Storage and similarity search for knowledge vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the index if it does not exist yet.
    async fn ensure_index(&self, dimension: usize, metric: &str) -> Result<()>;

    /// Inserts or replaces records by id, returning how many were written.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Returns at most `top_k` documents, most similar first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>>;
}
