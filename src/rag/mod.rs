//! Retrieve → augment → generate pipeline answering customer questions.

mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use prompt::{build_prompt, format_context, strip_markdown};

use crate::config::BotConfig;
use crate::embedding::{embed_blocking, Embedder};
use crate::error::{BotError, Result};
use crate::llm::ChatModel;
use crate::vectorstore::{ScoredDocument, VectorStore};

/// What the bot sends back for one customer message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReply {
    pub reply: String,
    pub quick_replies: Vec<String>,
    /// Titles of the documents the answer was grounded on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// The retrieval augmented chat bot.
///
/// Cheap to share: all collaborators sit behind `Arc`s.
pub struct RagBot {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn ChatModel>,
    settings: BotConfig,
    top_k: usize,
}

impl RagBot {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn ChatModel>,
        settings: BotConfig,
        top_k: usize,
    ) -> Self {
        info!("RAG bot ready (top_k = {})", top_k);
        Self {
            embedder,
            store,
            llm,
            settings,
            top_k,
        }
    }

    /// The reply used when the pipeline cannot run at all.
    pub fn error_reply(&self) -> BotReply {
        BotReply {
            reply: self.settings.generic_error_reply.clone(),
            quick_replies: self.settings.error_quick_replies.clone(),
            sources: Vec::new(),
        }
    }

    /// Finds the `top_k` documents most similar to `query`.
    pub async fn search_knowledge(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        let vector = embed_blocking(Arc::clone(&self.embedder), query.to_string()).await?;
        self.store.query(&vector, top_k).await
    }

    /// Asks the language model to answer `query` from `docs`.
    ///
    /// Never fails: model errors turn into apology messages.
    pub async fn generate_response(&self, query: &str, docs: &[ScoredDocument]) -> String {
        let prompt = build_prompt(query, docs);
        match self.llm.complete(&prompt).await {
            Ok(answer) => strip_markdown(&answer),
            Err(BotError::Upstream { status, .. }) => {
                error!("LLM returned status {}", status);
                self.settings.system_error_reply.clone()
            }
            Err(e) => {
                error!("LLM Error: {}", e);
                self.settings.cannot_answer_reply.clone()
            }
        }
    }

    /// Runs the full pipeline for one customer message.
    pub async fn process_message(&self, user_message: &str) -> BotReply {
        let documents = match self.search_knowledge(user_message, self.top_k).await {
            Ok(documents) => documents,
            Err(e) => {
                error!("RAG Error: {}", e);
                return self.error_reply();
            }
        };

        if documents.is_empty() {
            warn!("No knowledge found for message");
            return BotReply {
                reply: self.settings.not_found_reply.clone(),
                quick_replies: self.settings.no_result_quick_replies.clone(),
                sources: Vec::new(),
            };
        }

        let mut answer = self.generate_response(user_message, &documents).await;
        if answer.trim().is_empty() {
            answer = self.settings.cannot_answer_reply.clone();
        }

        BotReply {
            reply: answer,
            quick_replies: self.settings.quick_replies.clone(),
            sources: documents
                .iter()
                .take(self.settings.sources_shown)
                .map(|doc| doc.title.clone())
                .collect(),
        }
    }
}
