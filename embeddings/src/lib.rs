//! # Embeddings
//!
//! This crate provides embedding generation and exact similarity search for
//! docrag's retrieval corpus.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors through an
//!   [`EmbeddingProvider`] (Ollama or any OpenAI-compatible server)
//! - **Vector Index**: Append-only store of fragments and their vectors,
//!   answering top-k queries by cosine similarity
//! - **Corpus**: A cloneable, lock-guarded handle to the process-wide index
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► Corpus (RwLock)           │
//! │       │                                  │                      │
//! │       ▼                                  ▼                      │
//! │  Ollama/OpenAI                  VectorIndex ──► SearchHit       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod corpus;
pub mod error;
pub mod fragment;
pub mod index;
pub mod provider;
pub mod similarity;

pub use corpus::{Corpus, CorpusStats};
pub use error::{EmbeddingError, Result};
pub use fragment::Fragment;
pub use index::{SearchHit, VectorIndex};
pub use provider::{EmbeddingProvider, OllamaProvider, OpenAIProvider};
pub use similarity::{cosine_similarity, dot_product, magnitude};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Floor applied to vector magnitudes so zero vectors never divide by zero.
pub const NORM_EPSILON: f32 = 1e-9;
