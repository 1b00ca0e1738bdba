//! # Ingestion
//!
//! Turns raw documents into embedded fragments stored in the shared
//! [`Corpus`](docrag_embeddings::Corpus).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Ingestion Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DocumentLoader ──► TextChunker ──► Fragment[]                  │
//! │   (txt/md/pdf)                          │                       │
//! │                                         ▼                       │
//! │             EmbeddingProvider (one batch) ──► Corpus.add        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod chunker;
pub mod error;
pub mod loader;
pub mod pipeline;

pub use chunker::{ChunkerConfig, TextChunker, chunk};
pub use error::{IngestError, Result};
pub use loader::{Document, DocumentLoader};
pub use pipeline::{IngestReport, IngestionPipeline, SourceFailure, SourceOutcome};
