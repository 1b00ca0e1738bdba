//! Similarity computation for embeddings.

use crate::NORM_EPSILON;
use crate::error::{EmbeddingError, Result};

/// Euclidean length of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(dot_unchecked(a, b))
}

pub(crate) fn dot_unchecked(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity from a dot product and the two magnitudes.
///
/// Both magnitudes are floored at [`NORM_EPSILON`], so a zero vector scores
/// 0.0 against everything instead of producing NaN.
pub(crate) fn cosine_from_parts(dot: f32, magnitude_a: f32, magnitude_b: f32) -> f32 {
    dot / (magnitude_a.max(NORM_EPSILON) * magnitude_b.max(NORM_EPSILON))
}

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors (or a zero vector)
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    Ok(cosine_from_parts(dot, magnitude(a), magnitude(b)))
}
