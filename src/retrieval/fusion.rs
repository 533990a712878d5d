//! Reciprocal Rank Fusion over two independently ranked hit lists
//!
//! Fusion consumes rank position only, never the raw strategy scores, so it
//! is immune to the scale and sign incompatibilities between dense cosine
//! scores and lexical BM25 scores.

use crate::retrieval::{Chunk, RetrievalHit};
use std::collections::HashMap;

/// Standard RRF dampening constant. Fixed and documented, never tuned per
/// query; softens rank-1 dominance.
pub const RRF_K: f32 = 60.0;

/// A chunk identity plus its fused score; exists only for the duration of one
/// query. The per-strategy ranks double as the deterministic tie-break key.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub chunk: Chunk,
    pub score: f32,
    pub dense_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
}

/// Fuse two ranked hit lists keyed by chunk identity.
///
/// Each input must already be sorted best-first by its own strategy's scoring
/// convention. Rank `r` starts at 1; each appearance contributes
/// `1 / (k_constant + r)` to the chunk's fused score. A chunk present in both
/// lists accumulates both contributions; a chunk present in one still
/// participates with its partial contribution.
///
/// The result is ordered by descending fused score, ties broken by dense rank
/// then lexical rank so repeated calls with identical inputs produce
/// identical orderings.
pub fn reciprocal_rank_fusion(
    dense_hits: Vec<RetrievalHit>,
    lexical_hits: Vec<RetrievalHit>,
    k_constant: f32,
) -> Vec<FusedCandidate> {
    let mut fused: HashMap<String, FusedCandidate> = HashMap::new();

    for (i, hit) in dense_hits.into_iter().enumerate() {
        let rank = i + 1;
        let key = hit.chunk.chunk_id.clone();
        let entry = fused.entry(key).or_insert_with(|| FusedCandidate {
            chunk: hit.chunk,
            score: 0.0,
            dense_rank: None,
            lexical_rank: None,
        });
        entry.score += 1.0 / (k_constant + rank as f32);
        entry.dense_rank = Some(rank);
    }

    for (i, hit) in lexical_hits.into_iter().enumerate() {
        let rank = i + 1;
        let key = hit.chunk.chunk_id.clone();
        let entry = fused.entry(key).or_insert_with(|| FusedCandidate {
            chunk: hit.chunk,
            score: 0.0,
            dense_rank: None,
            lexical_rank: None,
        });
        entry.score += 1.0 / (k_constant + rank as f32);
        entry.lexical_rank = Some(rank);
    }

    let mut candidates: Vec<FusedCandidate> = fused.into_values().collect();
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.dense_rank
                    .unwrap_or(usize::MAX)
                    .cmp(&b.dense_rank.unwrap_or(usize::MAX))
            })
            .then_with(|| {
                a.lexical_rank
                    .unwrap_or(usize::MAX)
                    .cmp(&b.lexical_rank.unwrap_or(usize::MAX))
            })
    });

    candidates
}
