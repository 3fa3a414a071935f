use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use ndarray::ArrayView1;
use tracing::debug;

use super::{ScoredDocument, VectorRecord, VectorStore};
use crate::error::{BotError, Result};

/// In-process vector index ranked by cosine similarity.
///
/// Used for offline runs and tests; contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        // A panicked writer leaves the map itself intact
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        a.dot(&b) / denom
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_index(&self, _dimension: usize, _metric: &str) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut guard = self
            .records
            .write()
            .map_err(|e| BotError::VectorStore(format!("Failed to get write lock on records: {}", e)))?;
        let count = records.len();
        for record in records {
            guard.insert(record.id.clone(), record);
        }
        debug!("Upserted {} records into memory store", count);
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>> {
        let guard = self
            .records
            .read()
            .map_err(|e| BotError::VectorStore(format!("Failed to get read lock on records: {}", e)))?;

        let mut scored: Vec<ScoredDocument> = guard
            .values()
            .filter(|record| record.values.len() == vector.len())
            .map(|record| ScoredDocument {
                id: record.id.clone(),
                title: record.metadata.title.clone(),
                content: record.metadata.content.clone(),
                score: cosine(&record.values, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(top_k);
        Ok(scored)
    }
}
