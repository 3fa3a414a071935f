//! Wiring of settings into services, and the work behind each CLI command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use colored::*;
use tracing::{info, warn};

use crate::chat::display_reply;
use crate::config::{Secrets, Settings, VectorBackend};
use crate::embedding::{self, Embedder, SentenceEmbedder};
use crate::ingest::{self, SAMPLE_QUESTION};
use crate::line::LineClient;
use crate::llm::OpenRouterClient;
use crate::rag::RagBot;
use crate::server::{ApiServer, AppState};
use crate::vectorstore::{MemoryStore, PineconeStore, VectorStore};

/// Questions answered by `selftest`
pub const SELFTEST_QUERIES: [&str; 4] = [
    "สวัสดีครับ",
    "ราคาลาเต้เท่าไร?",
    "ร้านเปิดกี่โมง?",
    "มีที่จอดรถไหม?",
];

/// Loads the cached embedding model on a blocking thread.
pub async fn load_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedding_config = settings.embedding.clone();
    let embedder = tokio::task::spawn_blocking(move || embedding::load(&embedding_config))
        .await
        .context("model loading task failed")??;
    check_dimension(settings, &embedder)?;
    Ok(Arc::new(embedder))
}

/// Creates the configured vector store.
///
/// With `seed` set, the memory backend is filled from the seed file.
pub async fn build_store(
    settings: &Settings,
    secrets: &Secrets,
    embedder: Arc<dyn Embedder>,
    seed: bool,
) -> anyhow::Result<Arc<dyn VectorStore>> {
    match settings.vector_store.backend {
        VectorBackend::Pinecone => {
            let store = PineconeStore::new(&settings.vector_store, secrets.pinecone_api_key()?)?;
            Ok(Arc::new(store))
        }
        VectorBackend::Memory => {
            let store = MemoryStore::new();
            let seed_file = &settings.vector_store.seed_file;
            if !seed {
                return Ok(Arc::new(store));
            }
            if seed_file.exists() {
                let docs = ingest::load_documents(seed_file)?;
                ingest::ingest(&store, embedder, docs, false).await?;
            } else {
                warn!("Seed file {} not found, memory index starts empty", seed_file.display());
            }
            Ok(Arc::new(store))
        }
    }
}

fn check_dimension(settings: &Settings, embedder: &dyn Embedder) -> anyhow::Result<()> {
    if embedder.dimension() != settings.vector_store.dimension {
        bail!(
            "embedding model produces {}-dimensional vectors but the index expects {}",
            embedder.dimension(),
            settings.vector_store.dimension
        );
    }
    Ok(())
}

/// Connects an embedder, a store and the language model into a bot.
pub fn assemble_bot(
    settings: &Settings,
    secrets: &Secrets,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
) -> anyhow::Result<Arc<RagBot>> {
    let llm = OpenRouterClient::new(&settings.llm, secrets.openrouter_api_key()?)?;
    Ok(Arc::new(RagBot::new(
        embedder,
        store,
        Arc::new(llm),
        settings.bot.clone(),
        settings.vector_store.top_k,
    )))
}

/// Loads the model and builds a bot over the configured store.
pub async fn build_bot(settings: &Settings, secrets: &Secrets) -> anyhow::Result<Arc<RagBot>> {
    let embedder = load_embedder(settings).await?;
    let store = build_store(settings, secrets, Arc::clone(&embedder), true).await?;
    assemble_bot(settings, secrets, embedder, store)
}

fn needs_pinecone(settings: &Settings) -> bool {
    settings.vector_store.backend == VectorBackend::Pinecone
}

/// Runs the webhook server until shutdown.
pub async fn serve(settings: &Settings, secrets: &Secrets) -> anyhow::Result<()> {
    secrets.validate(needs_pinecone(settings), true)?;

    let bot = build_bot(settings, secrets).await?;
    let line = LineClient::new(&settings.line, secrets.line_channel_access_token()?)?;
    let state = AppState::new(
        bot,
        Arc::new(line),
        secrets.line_channel_secret()?,
        settings.server.threads,
        Duration::from_secs(settings.server.request_timeout_secs),
    );

    info!(
        "Topology: {} worker process, {} threads",
        settings.server.workers, settings.server.threads
    );
    let server = ApiServer::new(state, settings.server.host.clone(), settings.server.port);
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))
}

/// Downloads the embedding model. Blocking.
pub fn prefetch(settings: &Settings) -> anyhow::Result<()> {
    let files = embedding::prefetch(&settings.embedding).context("model prefetch failed")?;
    // Loading once proves the cached files are usable.
    let embedder = SentenceEmbedder::load(
        &files,
        settings.embedding.max_seq_len,
        settings.embedding.normalize,
    )?;
    check_dimension(settings, &embedder)?;
    println!(
        "✅ {} cached in {}",
        settings.embedding.model_id,
        settings.embedding.cache_dir.display()
    );
    Ok(())
}

/// Creates the index, uploads the knowledge file and verifies retrieval.
pub async fn setup(
    settings: &Settings,
    secrets: &Secrets,
    data: Option<&Path>,
    skip_verify: bool,
) -> anyhow::Result<usize> {
    secrets.validate(needs_pinecone(settings), false)?;
    println!("🚀 Coffee Corner RAG Bot Setup");
    println!("{}", "=".repeat(50));

    let embedder = load_embedder(settings).await?;
    let store = build_store(settings, secrets, Arc::clone(&embedder), false).await?;

    println!("📊 Setting up index...");
    store
        .ensure_index(settings.vector_store.dimension, &settings.vector_store.metric)
        .await
        .context("failed to prepare the index")?;

    println!("🏪 Importing cafe data...");
    let data = data.unwrap_or(settings.vector_store.seed_file.as_path());
    let docs = ingest::load_documents(data)
        .with_context(|| format!("failed to read {}", data.display()))?;
    let count = ingest::ingest(store.as_ref(), Arc::clone(&embedder), docs, true).await?;
    println!("✅ Uploaded {} documents", count);

    if !skip_verify {
        let bot = assemble_bot(settings, secrets, embedder, store)?;
        println!("🔍 Verifying setup...");
        let report = ingest::verify(&bot).await?;
        for (query, hit) in &report.probes {
            match hit {
                Some(title) => println!("✅ Query '{}': Found '{}'", query, title),
                None => println!("❌ Query '{}': No results", query),
            }
        }
        println!("\n🤖 Testing full RAG...");
        display_reply(Some(SAMPLE_QUESTION), &report.sample);
    }

    println!("\n🎉 Setup completed! {} documents ready", count);
    println!("📱 Run: cafebot serve (for LINE bot)");
    println!("🧪 Run: cafebot selftest (for testing)");
    Ok(count)
}

/// Answers the sample questions through the full pipeline.
pub async fn selftest(settings: &Settings, secrets: &Secrets) -> anyhow::Result<()> {
    secrets.validate(needs_pinecone(settings), false)?;
    println!("{}", "🧪 Testing RAG Bot...".bold());

    let bot = build_bot(settings, secrets).await?;
    for query in SELFTEST_QUERIES {
        let reply = bot.process_message(query).await;
        display_reply(Some(query), &reply);
    }
    Ok(())
}
