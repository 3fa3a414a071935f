use thiserror::Error;

/// Errors produced by the bot's services.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingSecrets(Vec<&'static str>),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model file '{file}' of {model_id} is not cached in {cache_dir}; run `cafebot prefetch` first")]
    ModelNotCached {
        model_id: String,
        file: String,
        cache_dir: String,
    },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for BotError {
    fn from(err: candle_core::Error) -> Self {
        BotError::Embedding(err.to_string())
    }
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::Config {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
