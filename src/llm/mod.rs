//! Chat completion clients used for the generate step.

mod openrouter;

use async_trait::async_trait;

pub use openrouter::OpenRouterClient;

use crate::error::Result;

/// A text generation backend that answers a single user prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
