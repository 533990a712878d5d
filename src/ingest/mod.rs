//! Document ingestion: extraction, chunking, embedding, index writes
//!
//! Document ids are content hashes, so identical uploads deduplicate and
//! chunk ids stay stable across re-ingestion. Every index write is
//! idempotent and keyed by chunk identity, making a whole ingestion run safe
//! to retry after a partial failure.

use crate::chunking::{ChunkError, Chunker};
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::index::{DenseIndex, LexicalIndex, LexicalIndexError, VectorIndexError};
use crate::retrieval::Chunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Document not found: {path}")]
    DocumentNotFound { path: String },

    #[error("Unsupported document type: {extension}")]
    UnsupportedDocument { extension: String },

    #[error("Document too large: {size_mb:.1}MB exceeds the {limit_mb}MB cap")]
    DocumentTooLarge { size_mb: f64, limit_mb: usize },

    #[error("Text extraction failed: {0}")]
    ExtractionError(String),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error(transparent)]
    Chunking(#[from] ChunkError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),

    #[error(transparent)]
    LexicalIndex(#[from] LexicalIndexError),
}

/// Document classification by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Pptx,
    Txt,
    Markdown,
    Csv,
    Xlsx,
    Image,
    Unknown,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match suffix.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "txt" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            "xlsx" | "xls" => Self::Xlsx,
            "png" | "jpg" | "jpeg" | "webp" => Self::Image,
            _ => Self::Unknown,
        }
    }
}

/// Format-specific text extraction collaborator; a black box returning
/// best-effort plain text for a classified file.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path, kind: DocumentKind) -> Result<String, IngestError>;
}

/// Extractor for formats that are already plain text.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path, kind: DocumentKind) -> Result<String, IngestError> {
        match kind {
            DocumentKind::Txt | DocumentKind::Markdown | DocumentKind::Csv => {
                std::fs::read_to_string(path).map_err(|e| IngestError::Io {
                    source: e,
                    context: format!("Failed to read document: {:?}", path),
                })
            }
            other => Err(IngestError::UnsupportedDocument {
                extension: format!("{:?}", other).to_lowercase(),
            }),
        }
    }
}

/// Receipt returned after a successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    /// Content-derived document id
    pub doc_id: String,
    pub source_path: String,
    pub chunk_count: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Ingestion pipeline: chunk, embed in batches, upsert into both indexes.
pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    dense: Arc<dyn DenseIndex>,
    lexical: Arc<dyn LexicalIndex>,
    batch_size: usize,
    max_upload_mb: usize,
}

impl Ingestor {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        dense: Arc<dyn DenseIndex>,
        lexical: Arc<dyn LexicalIndex>,
        batch_size: usize,
        max_upload_mb: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            dense,
            lexical,
            batch_size: batch_size.max(1),
            max_upload_mb,
        }
    }

    /// Ingest a document file via the given extractor.
    pub fn ingest_file(
        &self,
        path: &Path,
        extractor: &dyn TextExtractor,
    ) -> Result<IngestReceipt, IngestError> {
        if !path.exists() {
            return Err(IngestError::DocumentNotFound {
                path: path.display().to_string(),
            });
        }

        let kind = DocumentKind::from_path(path);
        if kind == DocumentKind::Unknown {
            return Err(IngestError::UnsupportedDocument {
                extension: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string(),
            });
        }

        let size = std::fs::metadata(path)
            .map_err(|e| IngestError::Io {
                source: e,
                context: format!("Failed to stat document: {:?}", path),
            })?
            .len();
        let size_mb = size as f64 / (1024.0 * 1024.0);
        if size_mb > self.max_upload_mb as f64 {
            return Err(IngestError::DocumentTooLarge {
                size_mb,
                limit_mb: self.max_upload_mb,
            });
        }

        let text = extractor.extract(path, kind)?;
        self.ingest_text(&text, &path.display().to_string())
    }

    /// Ingest already-extracted text.
    ///
    /// Zero-token text produces zero chunks and makes no embedding calls.
    pub fn ingest_text(&self, text: &str, source_path: &str) -> Result<IngestReceipt, IngestError> {
        let doc_id = blake3::hash(text.as_bytes()).to_hex().to_string();

        let pieces = self.chunker.chunk(text)?;
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Chunk::new(doc_id.clone(), i, piece, source_path))
            .collect();

        tracing::info!(
            doc_id = %doc_id,
            chunks = chunks.len(),
            "Ingesting document {}",
            source_path
        );

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;

            for (chunk, vector) in batch.iter().zip(vectors.iter()) {
                self.dense.upsert(chunk, vector)?;
                self.lexical.upsert(chunk)?;
            }
        }

        if !chunks.is_empty() {
            self.lexical.commit()?;
        }

        Ok(IngestReceipt {
            doc_id,
            source_path: source_path.to_string(),
            chunk_count: chunks.len(),
            ingested_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        assert_eq!(DocumentKind::from_path(Path::new("a.pdf")), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_path(Path::new("a.TXT")), DocumentKind::Txt);
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.md")),
            DocumentKind::Markdown
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("img.jpeg")),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("archive.zip")),
            DocumentKind::Unknown
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("no_extension")),
            DocumentKind::Unknown
        );
    }

    #[test]
    fn test_plain_text_extractor_rejects_binary_kinds() {
        let extractor = PlainTextExtractor;
        let result = extractor.extract(Path::new("a.pdf"), DocumentKind::Pdf);
        assert!(matches!(
            result,
            Err(IngestError::UnsupportedDocument { .. })
        ));
    }
}
