//! Token-window chunking over a canonical tokenization
//!
//! Documents are split into overlapping fixed-size token windows; the window
//! is the unit of retrieval. All boundaries are defined purely by token
//! offsets into a single cl100k_base tokenization of the document, so
//! re-chunking the same text with the same parameters reproduces identical
//! chunks.

use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Tokenizer initialization failed: {0}")]
    TokenizerError(String),

    #[error("Invalid chunk parameters: {0}")]
    InvalidParameters(String),

    #[error("Token decode failed: {0}")]
    DecodeError(String),
}

/// Splits text into overlapping token windows using cl100k_base.
pub struct Chunker {
    bpe: Arc<CoreBPE>,
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker with the given window width and overlap (in tokens).
    ///
    /// `chunk_size` of 0 is rejected immediately since the step computation
    /// would be undefined. An overlap at or above `chunk_size` is accepted but
    /// clamped at chunking time so the window always advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidParameters(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ChunkError::TokenizerError(e.to_string()))?;

        Ok(Self {
            bpe: Arc::new(bpe),
            chunk_size,
            overlap,
        })
    }

    /// Split `text` into ordered chunk texts.
    ///
    /// Encodes the full text once, slides a window of `chunk_size` tokens with
    /// a step of `max(1, chunk_size - overlap)` while the window start is
    /// within the token sequence, and decodes each window independently. The
    /// final window may be shorter. Empty text yields an empty sequence.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkError> {
        let ids = self.bpe.encode_ordinary(text);

        let spans = window_spans(ids.len(), self.chunk_size, self.overlap);
        let mut chunks = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            let piece = self
                .bpe
                .decode(ids[start..end].to_vec())
                .map_err(|e| ChunkError::DecodeError(e.to_string()))?;
            chunks.push(piece);
        }

        Ok(chunks)
    }

    /// Number of tokens in `text` under the canonical tokenization.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Window boundaries over a token sequence of length `len`.
///
/// The step is clamped to at least 1 so an overlap at or above `chunk_size`
/// cannot stall the window.
pub fn window_spans(len: usize, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    debug_assert!(chunk_size > 0);

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        spans.push((start, (start + chunk_size).min(len)));
        start += step;
    }
    spans
}
