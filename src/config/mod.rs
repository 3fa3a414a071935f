// Required external crates for configuration management and serialization
use serde::Deserialize;
use std::path::{Path, PathBuf};
use config::{Config, ConfigError, Environment, File};

mod secrets;

pub use secrets::Secrets;

/// Configuration for the HTTP server and its fixed process topology
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Number of server processes. Only a single process is supported.
    pub workers: usize,
    /// Runtime worker threads, also the number of messages answered concurrently
    pub threads: usize,
    /// Upper bound for handling one request
    pub request_timeout_secs: u64,
}

/// Configuration for the sentence-embedding model and its local cache
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Hugging Face model id, e.g. sentence-transformers/all-MiniLM-L6-v2
    pub model_id: String,
    /// Git revision of the model repository
    pub revision: String,
    /// Directory holding the downloaded model files
    pub cache_dir: PathBuf,
    /// Inputs longer than this many tokens are truncated
    pub max_seq_len: usize,
    /// L2-normalise embeddings
    pub normalize: bool,
    /// Download missing files at load time instead of failing
    pub allow_download: bool,
    /// Model hub the files are downloaded from
    pub hub_url: String,
}

/// Which vector index implementation to use
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Pinecone,
    Memory,
}

/// Configuration for the vector index holding the shop knowledge
#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
    pub index_name: String,
    /// Vector dimension, must match the embedding model
    pub dimension: usize,
    /// Similarity metric (cosine, euclidean, dotproduct)
    pub metric: String,
    pub cloud: String,
    pub region: String,
    /// Number of documents retrieved per question
    pub top_k: usize,
    /// Pinecone control plane URL
    pub controller_url: String,
    /// Data plane host. Resolved from the control plane when unset.
    pub index_host: Option<String>,
    pub api_version: String,
    pub upsert_batch_size: usize,
    /// Knowledge file used by `setup`, and loaded at startup by the memory backend
    pub seed_file: PathBuf,
}

/// Configuration for the chat completion API
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Controls randomness in generation
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Configuration for the LINE Messaging API
#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    pub api_base: String,
    pub timeout_secs: u64,
}

/// Canned replies and quick-reply buttons used by the bot
#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Buttons attached to a successful answer
    pub quick_replies: Vec<String>,
    /// Buttons attached when nothing relevant was found
    pub no_result_quick_replies: Vec<String>,
    /// Buttons attached when the pipeline failed
    pub error_quick_replies: Vec<String>,
    /// How many document titles are reported as sources
    pub sources_shown: usize,
    pub not_found_reply: String,
    pub system_error_reply: String,
    pub cannot_answer_reply: String,
    pub generic_error_reply: String,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Optional log directory for the rolling file appender
    pub file: Option<PathBuf>,
    /// Emit console logs as JSON
    pub json: bool,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub llm: LlmConfig,
    pub line: LineConfig,
    pub bot: BotConfig,
    pub logging: LoggingConfig,
}

/// Command-line overrides accepted by `serve`
#[derive(Debug, Default, Clone)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
    pub threads: Option<usize>,
}

const METRICS: [&str; 3] = ["cosine", "euclidean", "dotproduct"];

/// Implementation for loading and parsing configuration
impl Settings {
    /// Loads settings from the `config` directory of the current working directory.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");
        Self::load(&config_dir)
    }

    /// Creates a new Settings instance by loading config from multiple sources
    /// in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with CAFEBOT__ (sections separated by `__`)
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }

        let local_config = config_dir.join("local.toml");

        let settings = Config::builder()
            .add_source(File::from(default_config))
            .add_source(File::from(local_config).required(false))
            .add_source(
                Environment::with_prefix("CAFEBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Applies `serve` command-line flags on top of the loaded settings.
    pub fn apply_overrides(&mut self, overrides: ServeOverrides) -> Result<(), ConfigError> {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(workers) = overrides.workers {
            self.server.workers = workers;
        }
        if let Some(threads) = overrides.threads {
            self.server.threads = threads;
        }
        self.validate()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message(
                "Port must be between 1 and 65535, got: 0".to_string()
            ));
        }

        // The server runs as one process; concurrency comes from threads.
        if self.server.workers != 1 {
            return Err(ConfigError::Message(
                format!("Only a single worker process is supported, got: {}", self.server.workers)
            ));
        }

        if self.server.threads == 0 {
            return Err(ConfigError::Message(
                "threads must be greater than 0".to_string()
            ));
        }

        if self.embedding.max_seq_len == 0 {
            return Err(ConfigError::Message(
                "max_seq_len must be greater than 0".to_string()
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Message(
                format!("Temperature must be between 0.0 and 2.0, got: {}", self.llm.temperature)
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Message(
                "max_tokens must be greater than 0".to_string()
            ));
        }

        if self.vector_store.top_k == 0 {
            return Err(ConfigError::Message(
                "top_k must be greater than 0".to_string()
            ));
        }

        if self.vector_store.dimension == 0 {
            return Err(ConfigError::Message(
                "dimension must be greater than 0".to_string()
            ));
        }

        if self.vector_store.upsert_batch_size == 0 {
            return Err(ConfigError::Message(
                "upsert_batch_size must be greater than 0".to_string()
            ));
        }

        if !METRICS.contains(&self.vector_store.metric.as_str()) {
            return Err(ConfigError::Message(
                format!("Invalid metric: {}. Must be one of: {}",
                    self.vector_store.metric, METRICS.join(", "))
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }?;

        if !self.embedding.cache_dir.exists() {
            std::fs::create_dir_all(&self.embedding.cache_dir).map_err(|e| {
                ConfigError::Message(format!(
                    "Failed to create model cache directory at {}: {}",
                    self.embedding.cache_dir.display(), e
                ))
            })?;
        }

        if let Some(log_dir) = &self.logging.file {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir).map_err(|e| {
                    ConfigError::Message(format!(
                        "Failed to create log directory at {}: {}",
                        log_dir.display(), e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: &str = include_str!("../../config/default.toml");

    fn write_config(dir: &Path, local: Option<&str>) {
        let cache = dir.join("models");
        let defaults = DEFAULTS.replace(
            "cache_dir = \".cache/huggingface\"",
            &format!("cache_dir = {:?}", cache.display().to_string()),
        );
        std::fs::write(dir.join("default.toml"), defaults).unwrap();
        if let Some(local) = local {
            std::fs::write(dir.join("local.toml"), local).unwrap();
        }
    }

    #[test]
    fn loads_shipped_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), None);

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.server.workers, 1);
        assert_eq!(settings.server.threads, 4);
        assert_eq!(settings.embedding.model_id, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(settings.vector_store.dimension, 384);
        assert_eq!(settings.vector_store.top_k, 4);
        assert_eq!(settings.llm.max_tokens, 1000);
        assert!(settings.embedding.cache_dir.exists());
    }

    #[test]
    fn local_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), Some("[server]\nport = 9100\n"));

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("Config directory not found"));
    }

    #[test]
    fn rejects_multiple_workers() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), None);
        let mut settings = Settings::load(dir.path()).unwrap();

        let err = settings
            .apply_overrides(ServeOverrides { workers: Some(2), ..Default::default() })
            .unwrap_err();
        assert!(err.to_string().contains("single worker"));
    }

    #[test]
    fn overrides_apply_threads_and_port() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), None);
        let mut settings = Settings::load(dir.path()).unwrap();

        settings
            .apply_overrides(ServeOverrides {
                port: Some(8081),
                threads: Some(8),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.server.threads, 8);
    }

    #[test]
    fn rejects_unknown_metric_and_level() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), None);
        let mut settings = Settings::load(dir.path()).unwrap();

        settings.vector_store.metric = "manhattan".to_string();
        assert!(settings.validate().is_err());

        settings.vector_store.metric = "cosine".to_string();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());
    }
}
