//! Error types for ingestion.

use std::path::PathBuf;

use docrag_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while loading and ingesting documents.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The top-level path does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The file extension is not one the loader understands.
    #[error("unsupported file type '{extension}': {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The embedding provider could not produce vectors.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(#[source] EmbeddingError),

    /// Vector length inconsistent with the corpus dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The index rejected the batch for another reason.
    #[error("index error: {0}")]
    Index(#[source] EmbeddingError),

    /// PDF could not be parsed.
    #[error("failed to read PDF {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EmbeddingError> for IngestError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            err if err.is_provider_failure() => Self::EmbeddingUnavailable(err),
            err => Self::Index(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_errors_are_classified() {
        let err: IngestError = EmbeddingError::DimensionMismatch {
            expected: 3,
            actual: 4,
        }
        .into();
        assert!(matches!(
            err,
            IngestError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));

        let err: IngestError = EmbeddingError::ApiRequest("down".to_string()).into();
        assert!(matches!(err, IngestError::EmbeddingUnavailable(_)));

        let err: IngestError = EmbeddingError::EmptyEmbedding.into();
        assert!(matches!(err, IngestError::Index(_)));
    }

    #[test]
    fn test_messages_are_readable() {
        let err = IngestError::UnsupportedFormat {
            path: PathBuf::from("data/table.csv"),
            extension: "csv".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported file type 'csv': data/table.csv");
    }
}
