//! Dense and lexical index collaborators
//!
//! The retrieval core never owns vector or lexical records; it reaches them
//! through these narrow interfaces. Both in-process implementations are
//! provided (HNSW for dense, tantivy for lexical), and the traits keep every
//! collaborator replaceable by a test double.

mod lexical;
mod vector;

pub use lexical::{LexicalIndexError, TantivyLexicalIndex};
pub use vector::{HnswVectorIndex, VectorIndexError};

use crate::retrieval::{Chunk, RetrievalHit};

/// Dense vector index: idempotent upserts keyed by chunk identity and
/// rank-ordered similarity search.
pub trait DenseIndex: Send + Sync {
    /// Upsert a chunk's vector; must validate dimensionality and finiteness
    /// before accepting the write. Idempotent by chunk id and safe to retry.
    fn upsert(&self, chunk: &Chunk, vector: &[f32]) -> Result<(), VectorIndexError>;

    /// Ranked similarity search; higher scores are better matches.
    fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievalHit>, VectorIndexError>;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lexical index: idempotent upserts and BM25-ranked full-text search.
pub trait LexicalIndex: Send + Sync {
    /// Upsert a chunk's text keyed by chunk id. Idempotent and safe to retry.
    fn upsert(&self, chunk: &Chunk) -> Result<(), LexicalIndexError>;

    /// Make pending writes visible to searches.
    fn commit(&self) -> Result<(), LexicalIndexError>;

    /// Ranked keyword search. Query-syntax rejection is recovered internally
    /// by falling back to a literal, escaped query with a clamped limit; a
    /// query that still cannot be parsed yields an empty result set.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalHit>, LexicalIndexError>;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
