//! Hybrid search combining dense and lexical retrieval

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::index::{DenseIndex, LexicalIndex};
use crate::retrieval::{mmr_select, reciprocal_rank_fusion, Chunk, RetrievalHit};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingError(String),

    #[error("Diversity selection failed: {0}")]
    SelectionError(String),

    #[error("Hybrid search timed out after {0}s")]
    Timeout(u64),
}

/// Hybrid retriever coordinating dense search, lexical search, rank fusion
/// and diversity selection into a single ranked context set.
///
/// Every collaborator is injected, so the whole pipeline can be exercised
/// with test doubles. The retriever holds no per-query state; queries are
/// handled independently.
pub struct HybridRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    dense: Arc<dyn DenseIndex>,
    lexical: Arc<dyn LexicalIndex>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        dense: Arc<dyn DenseIndex>,
        lexical: Arc<dyn LexicalIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            dense,
            lexical,
            config,
        }
    }

    /// Retrieve the final ordered context set for a query.
    ///
    /// Dense and lexical searches run concurrently and are joined before
    /// fusion. The fused ranking is truncated to a pool of
    /// `pool_multiplier * top_k` candidates, which MMR then narrows to
    /// `top_k` in selection order. A `top_k` of 0 falls back to the
    /// configured default.
    ///
    /// The whole pipeline is bounded by the configured timeout; on expiry no
    /// partial fused state is returned.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }

        let top_k = if top_k == 0 {
            self.config.final_top_k
        } else {
            top_k
        };

        let timeout = Duration::from_secs(self.config.search_timeout_secs);
        match tokio::time::timeout(timeout, self.retrieve_inner(query, top_k)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.config.search_timeout_secs)),
        }
    }

    async fn retrieve_inner(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, SearchError> {
        // Step 1: embed the query
        let query_vec = self
            .embedder
            .embed(query)
            .map_err(|e| SearchError::EmbeddingError(e.to_string()))?;

        // Step 2: parallel dense + lexical search; no data dependency between
        // the two legs
        let lexical_query = normalize_lexical_query(query);
        let (dense_hits, lexical_hits) = tokio::join!(
            self.dense_search(&query_vec),
            self.lexical_search(&lexical_query),
        );

        // Step 3: Reciprocal Rank Fusion keyed by chunk identity
        let fused = reciprocal_rank_fusion(dense_hits, lexical_hits, self.config.rrf_k);

        // Step 4: widen to the candidate pool; fusion trims the pool but its
        // score does not feed the diversity pass
        let pool: Vec<Chunk> = fused
            .into_iter()
            .take(top_k.saturating_mul(self.config.pool_multiplier))
            .map(|c| c.chunk)
            .collect();

        if pool.is_empty() {
            return Ok(Vec::new());
        }

        // Step 5: re-embed query and candidates in one batch, then MMR down
        // to the final context set
        let mut batch = Vec::with_capacity(pool.len() + 1);
        batch.push(query.to_string());
        batch.extend(pool.iter().map(|c| c.text.clone()));

        let mut vectors = self
            .embedder
            .embed_batch(&batch)
            .map_err(|e| SearchError::EmbeddingError(e.to_string()))?;
        if vectors.len() != pool.len() + 1 {
            return Err(SearchError::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                pool.len() + 1,
                vectors.len()
            )));
        }
        let query_vec = vectors.remove(0);

        let order = mmr_select(&query_vec, &vectors, top_k, self.config.mmr_lambda)
            .map_err(|e| SearchError::SelectionError(e.to_string()))?;

        Ok(order.into_iter().map(|i| pool[i].clone()).collect())
    }

    /// Dense leg. An empty or unreachable dense index degrades to an empty
    /// contribution so fusion falls through to lexical-only.
    async fn dense_search(&self, query_vec: &[f32]) -> Vec<RetrievalHit> {
        if self.dense.is_empty() {
            return Vec::new();
        }

        match self.dense.search(query_vec, self.config.dense_limit) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Dense search unavailable, degrading to lexical only: {}", e);
                Vec::new()
            }
        }
    }

    /// Lexical leg. Query-syntax problems are recovered inside the index;
    /// only total lexical failure degrades to an empty contribution.
    async fn lexical_search(&self, query: &str) -> Vec<RetrievalHit> {
        match self.lexical.search(query, self.config.lexical_limit) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Lexical search failed, degrading to dense only: {}", e);
                Vec::new()
            }
        }
    }
}

/// Trim, drop a single trailing question mark, and collapse internal
/// whitespace; lexical engines are sensitive to stray punctuation.
pub fn normalize_lexical_query(query: &str) -> String {
    let query = query.trim();
    let query = query.strip_suffix('?').unwrap_or(query);
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
