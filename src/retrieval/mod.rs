//! Hybrid retrieval: similarity primitives, rank fusion, diversity selection
//!
//! Two independent strategies (dense vector similarity and BM25 lexical
//! search) run over the same chunk corpus. Their rankings are fused with
//! Reciprocal Rank Fusion keyed by chunk identity, then the fused pool is
//! diversified with Maximal Marginal Relevance before being handed to the
//! generation step.

mod fusion;
mod hybrid;
mod mmr;
mod similarity;

pub use fusion::{reciprocal_rank_fusion, FusedCandidate, RRF_K};
pub use hybrid::{HybridRetriever, SearchError};
pub use mmr::mmr_select;
pub use similarity::{cosine, SimilarityError};

use serde::{Deserialize, Serialize};

/// The atomic retrieval unit: a bounded token-span slice of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique, derived as `{doc_id}:{chunk_index}`; stable across
    /// re-ingestion of the same document
    pub chunk_id: String,

    /// Content hash of the source document, so identical uploads deduplicate
    pub doc_id: String,

    /// Zero-based ordinal position within the document's token stream
    pub chunk_index: usize,

    /// Decoded text of the token span
    pub text: String,

    /// Provenance pointer back to the source document
    pub source_path: String,
}

impl Chunk {
    pub fn new(
        doc_id: impl Into<String>,
        chunk_index: usize,
        text: impl Into<String>,
        source_path: impl Into<String>,
    ) -> Self {
        let doc_id = doc_id.into();
        Self {
            chunk_id: format!("{}:{}", doc_id, chunk_index),
            doc_id,
            chunk_index,
            text: text.into(),
            source_path: source_path.into(),
        }
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.len() <= max_chars {
            self.text.clone()
        } else {
            let mut end = max_chars;
            while !self.text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &self.text[..end])
        }
    }
}

/// A scored reference to a chunk from one retrieval strategy.
///
/// Created per query and discarded after fusion; never persisted. The score
/// convention is strategy-specific (cosine-like for dense, BM25 for lexical);
/// fusion only consumes rank position, never the raw score.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
}

impl RetrievalHit {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self { chunk, score }
    }

    pub fn chunk_id(&self) -> &str {
        &self.chunk.chunk_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_doc_id_and_index() {
        let chunk = Chunk::new("abc123", 4, "text", "/docs/a.txt");
        assert_eq!(chunk.chunk_id, "abc123:4");
    }

    #[test]
    fn test_preview_truncates() {
        let chunk = Chunk::new("d", 0, "0123456789", "p");
        assert_eq!(chunk.preview(4), "0123...");
        assert_eq!(chunk.preview(20), "0123456789");
    }
}
