//! Configuration for the retrieval engine.
//!
//! Values come from defaults, then an optional TOML file, then environment
//! variables.

use std::path::Path;
use std::str::FromStr;

use docrag_ingest::ChunkerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Name reported by health checks.
    pub app_name: String,

    /// Default tracing filter for the binary.
    pub log_level: String,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Chunking configuration.
    pub chunking: ChunkerConfig,

    /// Query configuration.
    pub query: QueryConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            app_name: "docrag".to_string(),
            log_level: "info".to_string(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkerConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl RagConfig {
    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the chunking configuration.
    pub fn with_chunking(mut self, config: ChunkerConfig) -> Self {
        self.chunking = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RetrievalError::Config(format!("Failed to parse config: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, overlaid with `path` when given, overlaid with the process
    /// environment. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognised keys: `APP_NAME`, `LOG_LEVEL`, `EMBEDDING_PROVIDER`,
    /// `EMBEDDING_MODEL`, `EMBEDDING_BASE_URL` (or `OLLAMA_BASE_URL`),
    /// `EMBEDDING_DIMENSIONS`, `CHUNK_SIZE`, `CHUNK_OVERLAP`, `RETRIEVE_TOP_K`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("APP_NAME") {
            self.app_name = name;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = Some(model);
        }
        if let Some(url) = lookup("EMBEDDING_BASE_URL").or_else(|| lookup("OLLAMA_BASE_URL")) {
            self.embedding.base_url = Some(url);
        }
        if let Some(dimensions) = lookup("EMBEDDING_DIMENSIONS") {
            self.embedding.dimensions = Some(parse_count("EMBEDDING_DIMENSIONS", &dimensions)?);
        }
        if let Some(size) = lookup("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_count("CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_count("CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(top_k) = lookup("RETRIEVE_TOP_K") {
            self.query.top_k = parse_count("RETRIEVE_TOP_K", &top_k)?;
        }
        Ok(self)
    }

    /// Reject settings that can never produce results.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RetrievalError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.embedding.dimensions == Some(0) {
            return Err(RetrievalError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.query.top_k == 0 {
            return Err(RetrievalError::Config(
                "top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| RetrievalError::Config(format!("{key}={value:?} is not a count: {e}")))
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings. `None` uses the provider's default.
    pub model: Option<String>,

    /// Server base URL. `None` uses the provider's default.
    pub base_url: Option<String>,

    /// Output dimensions to request from OpenAI models that support
    /// shortening. Ignored by Ollama.
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Ollama,
            model: None,
            base_url: None,
            dimensions: None,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// Local Ollama server.
    Ollama,
    /// OpenAI-compatible embeddings API.
    OpenAI,
}

impl FromStr for EmbeddingProviderType {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            other => Err(RetrievalError::Config(format!(
                "unknown embedding provider: {other}"
            ))),
        }
    }
}

/// Configuration for query processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Fragments returned when the caller gives no `k`.
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}
