//! Error types for the retrieval engine.

use docrag_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The provider could not embed the query.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(#[source] EmbeddingError),

    /// Embedding or index error.
    #[error("embedding error: {0}")]
    Embedding(#[source] EmbeddingError),

    /// Ingestion error.
    #[error("ingest error: {0}")]
    Ingest(#[from] docrag_ingest::IngestError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        if err.is_provider_failure() {
            Self::EmbeddingUnavailable(err)
        } else {
            Self::Embedding(err)
        }
    }
}
