//! Exact vector index over embedded fragments.

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::fragment::Fragment;
use crate::similarity::{cosine_from_parts, dot_unchecked, magnitude};

/// A stored fragment. The insertion position is its identity.
#[derive(Debug, Clone)]
struct IndexEntry {
    position: usize,
    fragment: Fragment,
    embedding: Embedding,
    magnitude: f32,
}

/// A fragment, its embedding and the embedding's magnitude.
pub(crate) type PreparedEntry = (Fragment, Embedding, f32);

/// Compute magnitudes up front so they can be produced outside any lock.
pub(crate) fn prepare(batch: Vec<(Fragment, Embedding)>) -> Vec<PreparedEntry> {
    batch
        .into_iter()
        .map(|(fragment, embedding)| {
            let magnitude = magnitude(&embedding);
            (fragment, embedding, magnitude)
        })
        .collect()
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Insertion position of the matched entry.
    pub position: usize,

    /// Cosine similarity to the query.
    pub score: f32,

    /// The matched fragment.
    pub fragment: Fragment,
}

/// Append-only store of fragments and their embeddings.
///
/// The dimension is fixed by the first vector ever added. Search is an
/// exact linear scan: O(n·d) per query.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// The established dimension, or `None` while the index is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a batch of fragments with their embeddings.
    ///
    /// The whole batch is validated before anything is appended: a single
    /// vector of the wrong length rejects the call and leaves the index as it
    /// was. Returns the number of entries added.
    pub fn add(&mut self, batch: Vec<(Fragment, Embedding)>) -> Result<usize> {
        self.add_prepared(prepare(batch))
    }

    /// [`VectorIndex::add`] for a batch whose magnitudes are already known.
    pub(crate) fn add_prepared(&mut self, batch: Vec<PreparedEntry>) -> Result<usize> {
        let Some((_, first, _)) = batch.first() else {
            return Ok(0);
        };

        let expected = self.dimension.unwrap_or(first.len());
        if expected == 0 {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        if let Some((_, bad, _)) = batch.iter().find(|(_, e, _)| e.len() != expected) {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let added = batch.len();
        self.entries.reserve(added);
        for (fragment, embedding, magnitude) in batch {
            let position = self.entries.len();
            self.entries.push(IndexEntry {
                position,
                fragment,
                embedding,
                magnitude,
            });
        }
        self.dimension = Some(expected);

        debug!("Added {added} entries to index (total {})", self.entries.len());
        Ok(added)
    }

    /// Find the `k` entries most similar to `query`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores are
    /// ordered by insertion position. `k` larger than the index is clamped.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(dimension) = self.dimension {
            if query.len() != dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: query.len(),
                });
            }
        }

        let query_magnitude = magnitude(query);
        let mut scored: Vec<(OrderedFloat<f32>, usize)> = self
            .entries
            .iter()
            .map(|entry| {
                let score = cosine_from_parts(
                    dot_unchecked(query, &entry.embedding),
                    query_magnitude,
                    entry.magnitude,
                );
                // NaN components rank last instead of first.
                let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
                (OrderedFloat(score), entry.position)
            })
            .collect();

        let by_rank = |a: &(OrderedFloat<f32>, usize), b: &(OrderedFloat<f32>, usize)| {
            b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1))
        };

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_rank);

        Ok(scored
            .into_iter()
            .map(|(score, position)| SearchHit {
                position,
                score: score.0,
                fragment: self.entries[position].fragment.clone(),
            })
            .collect())
    }
}
