#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cafebot::config::Settings;
use cafebot::embedding::Embedder;
use cafebot::llm::ChatModel;
use cafebot::vectorstore::{DocumentMetadata, MemoryStore, VectorRecord, VectorStore};
use cafebot::{BotError, Result};
use tempfile::TempDir;

const DEFAULTS: &str = include_str!("../../config/default.toml");

/// Loads the shipped defaults with the model cache redirected into a temp dir.
pub fn settings() -> (TempDir, Settings) {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("models");
    let defaults = DEFAULTS.replace(
        "cache_dir = \".cache/huggingface\"",
        &format!("cache_dir = {:?}", cache.display().to_string()),
    );
    std::fs::write(dir.path().join("default.toml"), defaults).unwrap();
    let settings = Settings::load(dir.path()).unwrap();
    (dir, settings)
}

/// Counts a few shop keywords; enough to make retrieval deterministic.
pub struct KeywordEmbedder;

pub const KEYWORDS: [&str; 3] = ["ลาเต้", "เปิด", "จอด"];

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(KEYWORDS
            .iter()
            .map(|k| text.matches(k).count() as f32)
            .collect())
    }

    fn dimension(&self) -> usize {
        KEYWORDS.len()
    }
}

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(BotError::Embedding("boom".to_string()))
    }

    fn dimension(&self) -> usize {
        3
    }
}

/// What the scripted model does when asked.
pub enum Script {
    Answer(String),
    Status(u16),
    Broken,
}

/// Chat model returning a scripted result and recording prompts.
pub struct ScriptedModel {
    pub script: Script,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.script {
            Script::Answer(answer) => Ok(answer.clone()),
            Script::Status(status) => Err(BotError::Upstream {
                service: "openrouter",
                status: *status,
                body: "unavailable".to_string(),
            }),
            Script::Broken => Err(BotError::InvalidResponse {
                service: "openrouter",
                message: "response has no choices".to_string(),
            }),
        }
    }
}

/// Chat model that takes `delay` to answer and tracks overlapping calls.
pub struct SlowModel {
    pub delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowModel {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    /// Highest number of calls that were running at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for SlowModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("เปิด 7 โมงค่ะ".to_string())
    }
}

/// A memory store holding a small menu.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let docs = [
        ("cafe_0", "ลาเต้", "ลาเต้ร้อน 60 บาท ลาเต้เย็น 65 บาท"),
        ("cafe_1", "เวลาเปิด-ปิด", "เปิดทุกวัน 7:00-18:00"),
        ("cafe_2", "ที่จอดรถ", "มีที่จอดรถหน้าร้าน 6 คัน"),
    ];
    let records = docs
        .iter()
        .map(|(id, title, content)| VectorRecord {
            id: id.to_string(),
            values: KeywordEmbedder
                .embed(&format!("{} {}", title, content))
                .unwrap(),
            metadata: DocumentMetadata {
                title: title.to_string(),
                content: content.to_string(),
                ..Default::default()
            },
        })
        .collect();
    store.upsert(records).await.unwrap();
    store
}
