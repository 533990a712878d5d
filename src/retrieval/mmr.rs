//! Maximal Marginal Relevance selection
//!
//! Greedy re-ranking that trades relevance against redundancy. Quadratic in
//! pool size times k, so candidate pools must be pre-truncated before calling
//! in here; this is not a whole-corpus reranker.

use crate::retrieval::similarity::{cosine, SimilarityError};

/// Select up to `k` candidate indices balancing relevance and novelty.
///
/// `lambda` in [0, 1]: 1.0 is pure relevance ranking, 0.0 pure
/// anti-redundancy. Scores each remaining candidate as
/// `lambda * rel[i] - (1 - lambda) * max_selected_sim[i]` and greedily takes
/// the best, breaking ties by first-encountered order so the output is
/// deterministic. The returned order is the selection order and is used
/// directly as presentation order.
///
/// `k == 0` or an empty candidate set yields an empty result.
pub fn mmr_select(
    query_vec: &[f32],
    candidate_vecs: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Result<Vec<usize>, SimilarityError> {
    let n = candidate_vecs.len();
    if n == 0 || k == 0 {
        return Ok(Vec::new());
    }
    let k = k.min(n);

    // Relevance to the query, computed once up front
    let mut relevance = Vec::with_capacity(n);
    for v in candidate_vecs {
        relevance.push(cosine(query_vec, v)?);
    }

    let mut selected: Vec<usize> = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..n).collect();

    // Seed with the single most relevant candidate; strict comparison keeps
    // the first-encountered index on ties
    let mut best_pos = 0;
    for (pos, &i) in remaining.iter().enumerate() {
        if relevance[i] > relevance[remaining[best_pos]] {
            best_pos = pos;
        }
    }
    selected.push(remaining.remove(best_pos));

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &i) in remaining.iter().enumerate() {
            // Diversity term: similarity to the closest already-selected item
            let mut diversity = f32::NEG_INFINITY;
            for &j in &selected {
                let sim = cosine(&candidate_vecs[i], &candidate_vecs[j])?;
                if sim > diversity {
                    diversity = sim;
                }
            }

            let score = lambda * relevance[i] - (1.0 - lambda) * diversity;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.remove(best_pos));
    }

    Ok(selected)
}
