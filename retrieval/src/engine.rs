//! Retrieval engine implementation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use docrag_embeddings::{
    Corpus, CorpusStats, EmbeddingProvider, Fragment, OllamaProvider, OpenAIProvider,
};
use docrag_ingest::{ChunkerConfig, IngestReport, IngestionPipeline};

use crate::config::{EmbeddingConfig, EmbeddingProviderType, RagConfig};
use crate::error::Result;

/// Separator placed between fragments in a context blob.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Fragments retrieved for one query, joined for generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedContext {
    /// Fragment contents joined with [`CONTEXT_SEPARATOR`].
    pub context: String,

    /// Distinct source ids, in order of first appearance.
    pub sources: Vec<String>,

    /// The fragments themselves, best match first.
    pub fragments: Vec<Fragment>,
}

impl RetrievedContext {
    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        let context = fragments
            .iter()
            .map(Fragment::content)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let mut sources: Vec<String> = Vec::new();
        for fragment in &fragments {
            if !sources.iter().any(|s| s == fragment.source_id()) {
                sources.push(fragment.source_id().to_string());
            }
        }

        Self {
            context,
            sources,
            fragments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Anything that can answer "which fragments best match this query".
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The `k` most similar fragments, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>>;

    /// Retrieve and join into a single context blob.
    async fn retrieve_context(&self, query: &str, k: usize) -> Result<RetrievedContext> {
        let fragments = self.retrieve(query, k).await?;
        Ok(RetrievedContext::from_fragments(fragments))
    }
}

/// Exact cosine retrieval over a [`Corpus`].
#[derive(Clone)]
pub struct CorpusRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Corpus,
}

impl CorpusRetriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, corpus: Corpus) -> Self {
        Self { provider, corpus }
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>> {
        if k == 0 || self.corpus.is_empty().await {
            debug!("Nothing to search for {query:?}");
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed_query(query).await?;
        let hits = self.corpus.search(&embedding, k).await?;

        debug!(
            "Retrieved {} fragments (best score {:?})",
            hits.len(),
            hits.first().map(|hit| hit.score)
        );

        Ok(hits.into_iter().map(|hit| hit.fragment).collect())
    }
}

/// Build the provider named by the configuration.
pub fn provider_from_config(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
    match config.provider {
        EmbeddingProviderType::Ollama => {
            let mut provider = OllamaProvider::new();
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Arc::new(provider)
        }
        EmbeddingProviderType::OpenAI => {
            let mut provider = OpenAIProvider::new();
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            if let Some(dimensions) = config.dimensions {
                provider = provider.with_dimensions(dimensions);
            }
            Arc::new(provider)
        }
    }
}

/// Retrieval engine: one corpus, one provider, ingestion and search.
///
/// Constructed explicitly by the entry point; clones of the underlying
/// [`Corpus`] may be handed to other tasks.
pub struct RagEngine {
    config: RagConfig,
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Corpus,
    pipeline: IngestionPipeline,
    retriever: CorpusRetriever,
}

impl RagEngine {
    /// Create a new engine builder.
    pub fn builder() -> RagEngineBuilder {
        RagEngineBuilder::new()
    }

    /// Initialize the engine with the given configuration.
    pub fn new(config: RagConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Ingest raw text with the configured chunking.
    pub async fn ingest_text(&self, source_id: &str, text: &str) -> Result<usize> {
        Ok(self.pipeline.ingest(source_id, text).await?)
    }

    /// Ingest raw text with an explicit chunk size and overlap.
    pub async fn ingest_text_with(
        &self,
        source_id: &str,
        text: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<usize> {
        Ok(self
            .pipeline
            .ingest_with(source_id, text, chunk_size, chunk_overlap)
            .await?)
    }

    /// Ingest a file or the supported files directly inside a directory.
    pub async fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
        Ok(self.pipeline.ingest_path(path.as_ref()).await?)
    }

    /// The `k` fragments most similar to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>> {
        self.retriever.retrieve(query, k).await
    }

    /// Retrieve with the configured top-k.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<Fragment>> {
        self.retrieve(query, self.config.query.top_k).await
    }

    /// Retrieve and join into a context blob.
    pub async fn retrieve_context(&self, query: &str, k: usize) -> Result<RetrievedContext> {
        self.retriever.retrieve_context(query, k).await
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        let CorpusStats {
            fragments,
            dimension,
        } = self.corpus.stats().await;

        EngineStats {
            fragments,
            dimension,
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: if self.provider.is_available() {
                "ok"
            } else {
                "degraded"
            },
            app_name: self.config.app_name.clone(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Builder for [`RagEngine`].
pub struct RagEngineBuilder {
    config: RagConfig,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    corpus: Option<Corpus>,
}

impl RagEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
            provider: None,
            corpus: None,
        }
    }

    pub fn with_config(mut self, config: RagConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this provider instead of the one named by the configuration.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share an existing corpus.
    pub fn with_corpus(mut self, corpus: Corpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkerConfig) -> Self {
        self.config.chunking = chunking;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.config.query.top_k = top_k;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<RagEngine> {
        self.config.validate()?;

        let provider = self
            .provider
            .unwrap_or_else(|| provider_from_config(&self.config.embedding));
        let corpus = self.corpus.unwrap_or_default();

        let pipeline = IngestionPipeline::with_config(
            self.config.chunking.clone(),
            provider.clone(),
            corpus.clone(),
        );
        let retriever = CorpusRetriever::new(provider.clone(), corpus.clone());

        info!(
            "Retrieval engine ready ({} / {}, chunk size {}, overlap {}, top-k {})",
            provider.name(),
            provider.model(),
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
            self.config.query.top_k
        );

        Ok(RagEngine {
            config: self.config,
            provider,
            corpus,
            pipeline,
            retriever,
        })
    }
}

impl Default for RagEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the retrieval engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Number of stored fragments.
    pub fragments: usize,

    /// Embedding dimension, once the first batch is stored.
    pub dimension: Option<usize>,

    pub provider: String,

    pub model: String,
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub app_name: String,
    pub version: &'static str,
}
