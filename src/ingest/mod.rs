//! Loading the shop knowledge into the vector index.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::Embedder;
use crate::error::{BotError, Result};
use crate::rag::{BotReply, RagBot};
use crate::vectorstore::{DocumentMetadata, VectorRecord, VectorStore};

/// Texts are embedded this many at a time
const EMBED_BATCH: usize = 16;

/// Queries used to check that the index answers after ingestion
pub const PROBE_QUERIES: [&str; 3] = ["เมนู", "ราคา", "เวลาเปิด"];

/// Question answered end to end after ingestion
pub const SAMPLE_QUESTION: &str = "ราคาลาเต้เท่าไร?";

/// One entry of the knowledge file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CafeDocument {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl CafeDocument {
    /// Text that gets embedded for this document
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// Reads a JSON array of documents.
pub fn load_documents(path: &Path) -> Result<Vec<CafeDocument>> {
    let content = std::fs::read_to_string(path)?;
    let docs: Vec<CafeDocument> = serde_json::from_str(&content)?;
    info!("Loaded {} documents from {}", docs.len(), path.display());
    Ok(docs)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_prefix("embedding");
    pb
}

/// Embeds every document, producing records with ids `cafe_{i}`.
///
/// Blocking; run it on a blocking thread from async code.
pub fn build_records(
    embedder: &dyn Embedder,
    docs: &[CafeDocument],
    show_progress: bool,
) -> Result<Vec<VectorRecord>> {
    let pb = progress_bar(docs.len(), show_progress);
    let mut records = Vec::with_capacity(docs.len());

    for (batch_index, batch) in docs.chunks(EMBED_BATCH).enumerate() {
        let texts: Vec<String> = batch.iter().map(CafeDocument::embedding_text).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = embedder.embed_batch(&refs)?;
        if vectors.len() != batch.len() {
            return Err(BotError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        for (offset, (doc, values)) in batch.iter().zip(vectors).enumerate() {
            records.push(VectorRecord {
                id: format!("cafe_{}", batch_index * EMBED_BATCH + offset),
                values,
                metadata: DocumentMetadata {
                    title: doc.title.clone(),
                    content: doc.content.clone(),
                    source_url: doc.source_url.clone(),
                    kind: doc.kind.clone(),
                },
            });
        }
        pb.inc(batch.len() as u64);
    }

    pb.finish_with_message("done");
    Ok(records)
}

/// Embeds and uploads the documents, returning how many were stored.
pub async fn ingest(
    store: &dyn VectorStore,
    embedder: Arc<dyn Embedder>,
    docs: Vec<CafeDocument>,
    show_progress: bool,
) -> Result<usize> {
    let records = tokio::task::spawn_blocking(move || build_records(embedder.as_ref(), &docs, show_progress))
        .await
        .map_err(|e| BotError::Embedding(format!("embedding task failed: {}", e)))??;

    let count = store.upsert(records).await?;
    info!("Uploaded {} documents", count);
    Ok(count)
}

/// Outcome of the post-ingestion check.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// Probe query and the title of its best match, if any
    pub probes: Vec<(String, Option<String>)>,
    pub sample: BotReply,
}

impl VerifyReport {
    pub fn all_found(&self) -> bool {
        self.probes.iter().all(|(_, hit)| hit.is_some())
    }
}

/// Runs the probe queries and one full answer against the live index.
pub async fn verify(bot: &RagBot) -> Result<VerifyReport> {
    let mut probes = Vec::with_capacity(PROBE_QUERIES.len());
    for query in PROBE_QUERIES {
        let hits = bot.search_knowledge(query, 1).await?;
        probes.push((query.to_string(), hits.into_iter().next().map(|doc| doc.title)));
    }

    let sample = bot.process_message(SAMPLE_QUESTION).await;
    Ok(VerifyReport { probes, sample })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorstore::MemoryStore;

    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.chars().count() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn docs(n: usize) -> Vec<CafeDocument> {
        (0..n)
            .map(|i| CafeDocument {
                title: format!("doc{i}"),
                content: "x".repeat(i + 1),
                source_url: String::new(),
                kind: "menu".to_string(),
            })
            .collect()
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let parsed: Vec<CafeDocument> =
            serde_json::from_str(r#"[{"title":"ลาเต้","content":"65 บาท"}]"#).unwrap();
        assert_eq!(parsed[0].source_url, "");
        assert_eq!(parsed[0].kind, "");
        assert_eq!(parsed[0].embedding_text(), "ลาเต้ 65 บาท");
    }

    #[test]
    fn ids_are_sequential_across_batches() {
        let records = build_records(&LengthEmbedder, &docs(EMBED_BATCH + 3), false).unwrap();
        assert_eq!(records.len(), EMBED_BATCH + 3);
        assert_eq!(records[0].id, "cafe_0");
        assert_eq!(records[EMBED_BATCH].id, format!("cafe_{}", EMBED_BATCH));
        assert_eq!(records.last().unwrap().id, format!("cafe_{}", EMBED_BATCH + 2));
        assert_eq!(records[1].metadata.kind, "menu");
        // "doc1 xx" is 7 characters
        assert_eq!(records[1].values, vec![7.0, 1.0]);
    }

    #[tokio::test]
    async fn ingest_writes_to_store() {
        let store = MemoryStore::new();
        let count = ingest(&store, Arc::new(LengthEmbedder), docs(5), false).await.unwrap();
        assert_eq!(count, 5);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn load_documents_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cafe_data.json");
        std::fs::write(
            &path,
            r#"[{"title":"เวลาเปิด","content":"7:00-18:00","source_url":"https://example.com","type":"info"}]"#,
        )
        .unwrap();

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, "info");
        assert_eq!(docs[0].source_url, "https://example.com");
    }
}
