//! Vector similarity primitives shared by the fusion inputs and the MMR
//! selector.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("Dimension mismatch: left {left}, right {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Cosine similarity between two equal-length vectors, in [-1, 1].
///
/// A zero-magnitude vector on either side yields exactly 0.0 rather than an
/// error or NaN, so downstream scoring never branches on degenerate
/// embeddings. Mismatched lengths are a caller contract violation.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    Ok(dot / (mag_a * mag_b))
}
