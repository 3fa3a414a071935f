pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod line;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod server;
pub mod vectorstore;

pub use config::{Secrets, Settings};
pub use error::{BotError, Result};
pub use rag::{BotReply, RagBot};
