//! Shared handle to the process-wide retrieval corpus.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::Embedding;
use crate::error::Result;
use crate::fragment::Fragment;
use crate::index::{SearchHit, VectorIndex, prepare};

/// A cloneable handle to one [`VectorIndex`].
///
/// Searches share the read lock and may run in parallel. An add holds the
/// write lock for the whole batch, so readers observe either the index
/// before the batch or after it, never a partial append.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    index: Arc<RwLock<VectorIndex>>,
}

/// Snapshot of corpus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Number of stored fragments.
    pub fragments: usize,

    /// Embedding dimension, once established.
    pub dimension: Option<usize>,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch atomically. See [`VectorIndex::add`].
    pub async fn add(&self, batch: Vec<(Fragment, Embedding)>) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let prepared = prepare(batch);
        let mut index = self.index.write().await;
        let added = index.add_prepared(prepared)?;
        info!("Corpus now holds {} fragments", index.len());
        Ok(added)
    }

    /// Top-k search under the shared read lock. See [`VectorIndex::search`].
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.index.read().await.search(query, k)
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    pub async fn stats(&self) -> CorpusStats {
        let index = self.index.read().await;
        CorpusStats {
            fragments: index.len(),
            dimension: index.dimension(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn batch(tag: usize, size: usize) -> Vec<(Fragment, Embedding)> {
        (0..size)
            .map(|i| {
                let fragment = Fragment::new(format!("batch {tag} item {i}"), i, 0, 0)
                    .with_source(format!("source-{tag}"));
                (fragment, vec![1.0, tag as f32, i as f32])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_clones_share_one_index() {
        let corpus = Corpus::new();
        let handle = corpus.clone();

        handle.add(batch(0, 3)).await.unwrap();

        assert_eq!(
            corpus.stats().await,
            CorpusStats {
                fragments: 3,
                dimension: Some(3)
            }
        );
    }

    #[tokio::test]
    async fn test_scores_match_cosine_similarity() {
        let corpus = Corpus::new();
        let added = batch(2, 4);
        let expected: Vec<f32> = added
            .iter()
            .map(|(_, e)| crate::cosine_similarity(&[1.0, 0.0, 3.0], e).unwrap())
            .collect();
        corpus.add(added).await.unwrap();

        let hits = corpus.search(&[1.0, 0.0, 3.0], 4).await.unwrap();

        assert_eq!(hits.len(), 4);
        for hit in hits {
            assert!((hit.score - expected[hit.position]).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_empty_corpus_search() {
        let corpus = Corpus::new();
        assert!(corpus.is_empty().await);
        assert!(corpus.search(&[1.0, 0.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_searches_never_see_partial_batches() {
        const BATCH: usize = 8;
        let corpus = Corpus::new();

        let writer = {
            let corpus = corpus.clone();
            tokio::spawn(async move {
                for tag in 0..20 {
                    corpus.add(batch(tag, BATCH)).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let corpus = corpus.clone();
                tokio::spawn(async move {
                    for _ in 0..50 {
                        let hits = corpus.search(&[1.0, 0.5, 0.5], usize::MAX).await.unwrap();
                        assert_eq!(hits.len() % BATCH, 0);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(corpus.len().await, 20 * BATCH);
    }
}
