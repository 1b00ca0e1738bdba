//! # Retrieval Engine
//!
//! This crate wires the pieces of docrag together:
//!
//! - **Configuration**: defaults, TOML files and environment overrides
//! - **Ingestion**: documents chunked and embedded into a shared corpus
//! - **Retrieval**: exact cosine search behind the [`Retriever`] trait
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        RagEngine                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  RagConfig ──► EmbeddingProvider ──┬──► IngestionPipeline       │
//! │                                    │            │               │
//! │                                    │            ▼               │
//! │                                    │         Corpus             │
//! │                                    │            ▲               │
//! │                                    └──► CorpusRetriever         │
//! │                                                 │               │
//! │                                                 ▼               │
//! │                                        RetrievedContext         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrag_retrieval::{RagConfig, RagEngine};
//!
//! let engine = RagEngine::new(RagConfig::from_env()?)?;
//! engine.ingest_path("docs/").await?;
//!
//! let context = engine.retrieve_context("How are refunds handled?", 4).await?;
//! println!("{}", context.context);
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::{EmbeddingConfig, EmbeddingProviderType, QueryConfig, RagConfig};
pub use engine::{
    CONTEXT_SEPARATOR, CorpusRetriever, EngineStats, HealthStatus, RagEngine, RagEngineBuilder,
    RetrievedContext, Retriever, provider_from_config,
};
pub use error::{Result, RetrievalError};

// Re-export from dependencies for convenience
pub use docrag_embeddings::{Corpus, EmbeddingProvider, Fragment};
pub use docrag_ingest::{ChunkerConfig, IngestReport};
