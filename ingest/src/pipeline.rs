//! Ingestion pipeline orchestration.
//!
//! Chunks a document, embeds every fragment in a single provider call and
//! appends the whole batch to the corpus in one atomic add.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docrag_embeddings::{Corpus, EmbeddingError, EmbeddingProvider, Fragment};
use tracing::{debug, info, warn};

use crate::chunker::{ChunkerConfig, TextChunker};
use crate::error::{IngestError, Result};
use crate::loader::{Document, DocumentLoader};

/// One source that was ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source_id: String,
    pub fragments: usize,
}

/// One source that failed; its siblings are unaffected.
#[derive(Debug)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Result of ingesting a file or a directory.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Total fragments appended to the corpus.
    pub fragments_added: usize,

    pub sources: Vec<SourceOutcome>,

    pub failures: Vec<SourceFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Chunk, embed and store documents.
pub struct IngestionPipeline {
    chunker: TextChunker,
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Corpus,
}

impl IngestionPipeline {
    /// Create a pipeline with the default chunker configuration.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, corpus: Corpus) -> Self {
        Self::with_config(ChunkerConfig::default(), provider, corpus)
    }

    pub fn with_config(
        config: ChunkerConfig,
        provider: Arc<dyn EmbeddingProvider>,
        corpus: Corpus,
    ) -> Self {
        Self {
            chunker: TextChunker::with_config(config),
            provider,
            corpus,
        }
    }

    pub fn chunker_config(&self) -> &ChunkerConfig {
        self.chunker.config()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Ingest raw text with the configured chunk size and overlap.
    ///
    /// Returns the number of fragments added. On error the corpus is left
    /// unchanged.
    pub async fn ingest(&self, source_id: &str, raw_text: &str) -> Result<usize> {
        let fragments = self.chunker.chunk(raw_text);
        self.store(source_id, fragments).await
    }

    /// Ingest raw text with an explicit chunk size and overlap.
    pub async fn ingest_with(
        &self,
        source_id: &str,
        raw_text: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<usize> {
        let chunker = TextChunker::with_config(ChunkerConfig {
            chunk_size,
            chunk_overlap,
            ..self.chunker.config().clone()
        });
        let fragments = chunker.chunk(raw_text);
        self.store(source_id, fragments).await
    }

    /// Ingest a loaded document.
    pub async fn ingest_document(&self, document: &Document) -> Result<usize> {
        self.ingest(&document.source_id, &document.text).await
    }

    /// Ingest a single file, or every supported file directly inside a
    /// directory.
    ///
    /// A missing path or an unsupported single file is an error. Within a
    /// directory each file is ingested on its own and failures are collected
    /// in the report.
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestError::PathNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = IngestReport::default();

        if metadata.is_file() {
            let document = DocumentLoader::load_file(path).await?;
            let fragments = self.ingest_document(&document).await?;
            report.fragments_added = fragments;
            report.sources.push(SourceOutcome {
                source_id: document.source_id,
                fragments,
            });
            return Ok(report);
        }

        let files = DocumentLoader::collect_directory(path)?;
        info!("Ingesting {} files from {}", files.len(), path.display());

        for file in files {
            let outcome = match DocumentLoader::load_file(&file).await {
                Ok(document) => self
                    .ingest_document(&document)
                    .await
                    .map(|fragments| (document.source_id, fragments)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok((source_id, fragments)) => {
                    report.fragments_added += fragments;
                    report.sources.push(SourceOutcome {
                        source_id,
                        fragments,
                    });
                }
                Err(error) => {
                    warn!("Failed to ingest {}: {error}", file.display());
                    report.failures.push(SourceFailure { path: file, error });
                }
            }
        }

        info!(
            "Ingested {} fragments from {} sources ({} failed)",
            report.fragments_added,
            report.sources.len(),
            report.failures.len()
        );

        Ok(report)
    }

    async fn store(&self, source_id: &str, fragments: Vec<Fragment>) -> Result<usize> {
        if fragments.is_empty() {
            debug!("Nothing to ingest for {source_id}");
            return Ok(0);
        }

        let fragments: Vec<Fragment> = fragments
            .into_iter()
            .map(|fragment| {
                if fragment.has_source() {
                    fragment
                } else {
                    fragment.with_source(source_id)
                }
            })
            .collect();

        let texts: Vec<String> = fragments
            .iter()
            .map(|fragment| fragment.content().to_string())
            .collect();

        let embeddings = self
            .provider
            .embed_documents(&texts)
            .await
            .map_err(IngestError::EmbeddingUnavailable)?;

        if embeddings.len() != fragments.len() {
            return Err(IngestError::EmbeddingUnavailable(
                EmbeddingError::InvalidResponse(format!(
                    "{} returned {} embeddings for {} fragments",
                    self.provider.name(),
                    embeddings.len(),
                    fragments.len()
                )),
            ));
        }

        let added = self
            .corpus
            .add(fragments.into_iter().zip(embeddings).collect())
            .await?;

        info!("Ingested {added} fragments from {source_id}");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docrag_embeddings::Embedding;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Letter-frequency embeddings with a configurable width.
    struct MockProvider {
        dimension: usize,
        calls: AtomicUsize,
        fail: bool,
        drop_last: bool,
    }

    impl MockProvider {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: AtomicUsize::new(0),
                fail: false,
                drop_last: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "letters"
        }

        async fn embed_documents(
            &self,
            texts: &[String],
        ) -> docrag_embeddings::Result<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbeddingError::ApiRequest("connection refused".to_string()));
            }

            let mut vectors: Vec<Embedding> = texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0; self.dimension];
                    for b in text.bytes().filter(u8::is_ascii_alphabetic) {
                        v[usize::from(b.to_ascii_lowercase() - b'a') % self.dimension] += 1.0;
                    }
                    v
                })
                .collect();
            if self.drop_last {
                vectors.pop();
            }
            Ok(vectors)
        }
    }

    fn pipeline(provider: Arc<MockProvider>, corpus: Corpus) -> IngestionPipeline {
        IngestionPipeline::with_config(
            ChunkerConfig {
                chunk_size: 40,
                chunk_overlap: 8,
                preserve_oversized_units: false,
            },
            provider,
            corpus,
        )
    }

    const TEXT: &str = "Tokio drives async tasks on a thread pool. \
        Readers share the lock while writers wait. \
        Batches land atomically in the index.";

    #[tokio::test]
    async fn test_ingest_embeds_once_per_document() {
        let provider = Arc::new(MockProvider::new(26));
        let corpus = Corpus::new();
        let pipeline = pipeline(provider.clone(), corpus.clone());

        let added = pipeline.ingest("notes.txt", TEXT).await.unwrap();

        assert!(added > 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(corpus.len().await, added);

        let hits = corpus.search(&[1.0; 26], added).await.unwrap();
        assert!(hits.iter().all(|h| h.fragment.source_id() == "notes.txt"));
    }

    #[tokio::test]
    async fn test_blank_text_skips_provider() {
        let provider = Arc::new(MockProvider::new(26));
        let pipeline = pipeline(provider.clone(), Corpus::new());

        assert_eq!(pipeline.ingest("empty.txt", " \n\n ").await.unwrap(), 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_ingest_with_overrides_sizes() {
        let provider = Arc::new(MockProvider::new(26));
        let pipeline = pipeline(provider, Corpus::new());

        let added = pipeline.ingest_with("notes.txt", TEXT, 1000, 0).await.unwrap();

        assert_eq!(added, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_corpus_untouched() {
        let provider = Arc::new(MockProvider {
            fail: true,
            ..MockProvider::new(26)
        });
        let corpus = Corpus::new();
        let pipeline = pipeline(provider, corpus.clone());

        let err = pipeline.ingest("notes.txt", TEXT).await.unwrap_err();

        assert!(matches!(err, IngestError::EmbeddingUnavailable(_)));
        assert!(corpus.is_empty().await);
    }

    #[tokio::test]
    async fn test_short_vector_count_is_rejected() {
        let provider = Arc::new(MockProvider {
            drop_last: true,
            ..MockProvider::new(26)
        });
        let corpus = Corpus::new();
        let pipeline = pipeline(provider, corpus.clone());

        let err = pipeline.ingest("notes.txt", TEXT).await.unwrap_err();

        assert!(matches!(err, IngestError::EmbeddingUnavailable(_)));
        assert!(corpus.is_empty().await);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_with_existing_corpus() {
        let corpus = Corpus::new();
        pipeline(Arc::new(MockProvider::new(26)), corpus.clone())
            .ingest("a.txt", TEXT)
            .await
            .unwrap();
        let before = corpus.len().await;

        let err = pipeline(Arc::new(MockProvider::new(8)), corpus.clone())
            .ingest("b.txt", TEXT)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::DimensionMismatch {
                expected: 26,
                actual: 8
            }
        ));
        assert_eq!(corpus.len().await, before);
    }

    #[tokio::test]
    async fn test_ingest_directory_collects_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), TEXT).unwrap();
        std::fs::write(dir.path().join("b.md"), "# Short\n\nOne line.").unwrap();
        std::fs::write(dir.path().join("c.pdf"), b"not really a pdf").unwrap();
        std::fs::write(dir.path().join("ignored.csv"), "x,y").unwrap();

        let provider = Arc::new(MockProvider::new(26));
        let corpus = Corpus::new();
        let pipeline = pipeline(provider.clone(), corpus.clone());

        let report = pipeline.ingest_path(dir.path()).await.unwrap();

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_clean());
        assert!(report.failures[0].path.ends_with("c.pdf"));
        assert!(matches!(report.failures[0].error, IngestError::Pdf { .. }));
        assert_eq!(report.fragments_added, corpus.len().await);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_ingest_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.text");
        std::fs::write(&path, TEXT).unwrap();

        let pipeline = pipeline(Arc::new(MockProvider::new(26)), Corpus::new());
        let report = pipeline.ingest_path(&path).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(
            report.sources,
            vec![SourceOutcome {
                source_id: path.display().to_string(),
                fragments: report.fragments_added,
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_path_and_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(MockProvider::new(26)), Corpus::new());

        let err = pipeline
            .ingest_path(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::PathNotFound(_)));

        let csv = dir.path().join("data.csv");
        std::fs::write(&csv, "x,y").unwrap();
        let err = pipeline.ingest_path(&csv).await.unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
    }
}
