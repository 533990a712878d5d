//! Tantivy lexical index with BM25 ranking
use crate::index::LexicalIndex;
use crate::retrieval::{Chunk, RetrievalHit};
use std::path::PathBuf;
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::{Query, QueryParser};
use tantivy::schema::*;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexicalIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Tantivy error: {0}")]
    TantivyError(#[from] TantivyError),
}

/// Fallback searches clamp the caller-supplied limit into this range.
const FALLBACK_LIMIT_MAX: usize = 200;

/// Tantivy-backed lexical index over chunk text.
///
/// Each document stores the full chunk payload so hits can be materialized
/// without a separate lookup. Upserts delete-then-add by chunk id, making
/// duplicate submissions safe.
pub struct TantivyLexicalIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    chunk_id_field: Field,
    doc_id_field: Field,
    chunk_index_field: Field,
    source_path_field: Field,
    text_field: Field,
    #[allow(dead_code)]
    index_path: PathBuf,
}

impl TantivyLexicalIndex {
    /// Open an index at `index_path`, creating it if absent.
    pub fn new(index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        if index_path.exists() && index_path.join("meta.json").exists() {
            Self::load(index_path)
        } else {
            Self::create(index_path)
        }
    }

    fn schema() -> Schema {
        let mut schema_builder = Schema::builder();
        schema_builder.add_text_field("chunk_id", STRING | STORED);
        schema_builder.add_text_field("doc_id", STRING | STORED);
        schema_builder.add_u64_field("chunk_index", STORED);
        schema_builder.add_text_field("source_path", STORED);
        schema_builder.add_text_field("text", TEXT | STORED);
        schema_builder.build()
    }

    fn create(index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        std::fs::create_dir_all(&index_path)?;

        let schema = Self::schema();
        let index = Index::create_in_dir(&index_path, schema.clone())
            .map_err(|e| LexicalIndexError::InitializationError(e.to_string()))?;

        Self::open_handles(index, index_path)
    }

    fn load(index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        if !index_path.exists() {
            return Err(LexicalIndexError::IndexNotFound(
                index_path.display().to_string(),
            ));
        }

        let index = Index::open_in_dir(&index_path)
            .map_err(|e| LexicalIndexError::InitializationError(e.to_string()))?;

        Self::open_handles(index, index_path)
    }

    fn open_handles(index: Index, index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        let schema = index.schema();
        let field = |name: &str| {
            schema.get_field(name).map_err(|_| {
                LexicalIndexError::InitializationError(format!("Missing '{name}' field in schema"))
            })
        };

        let chunk_id_field = field("chunk_id")?;
        let doc_id_field = field("doc_id")?;
        let chunk_index_field = field("chunk_index")?;
        let source_path_field = field("source_path")?;
        let text_field = field("text")?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| LexicalIndexError::InitializationError(e.to_string()))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e: TantivyError| LexicalIndexError::InitializationError(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            chunk_id_field,
            doc_id_field,
            chunk_index_field,
            source_path_field,
            text_field,
            index_path,
        })
    }

    /// Ordered query plans: the parsed query first, then a literal quoted
    /// phrase with a clamped limit. A query neither plan can parse yields no
    /// plan at all, which the caller maps to an empty result set.
    fn plan_query(&self, query: &str, limit: usize) -> Option<(Box<dyn Query>, usize)> {
        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);

        if let Ok(parsed) = parser.parse_query(query) {
            return Some((parsed, limit.max(1)));
        }

        let literal = escape_literal(query);
        let clamped = limit.clamp(1, FALLBACK_LIMIT_MAX);
        match parser.parse_query(&literal) {
            Ok(parsed) => Some((parsed, clamped)),
            Err(_) => None,
        }
    }

    fn materialize(
        &self,
        searcher: &tantivy::Searcher,
        score: f32,
        address: tantivy::DocAddress,
    ) -> Result<RetrievalHit, LexicalIndexError> {
        let retrieved: TantivyDocument = searcher
            .doc(address)
            .map_err(|e| LexicalIndexError::SearchError(e.to_string()))?;

        let text_value = |field: Field| {
            retrieved
                .get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let chunk_id = text_value(self.chunk_id_field);
        let chunk_index = retrieved
            .get_first(self.chunk_index_field)
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        let mut chunk = Chunk::new(
            text_value(self.doc_id_field),
            chunk_index,
            text_value(self.text_field),
            text_value(self.source_path_field),
        );
        chunk.chunk_id = chunk_id;

        Ok(RetrievalHit::new(chunk, score))
    }
}

impl LexicalIndex for TantivyLexicalIndex {
    fn upsert(&self, chunk: &Chunk) -> Result<(), LexicalIndexError> {
        let writer = self.writer.lock().unwrap();

        // Delete-then-add keyed by chunk id keeps re-ingestion idempotent
        let term = Term::from_field_text(self.chunk_id_field, &chunk.chunk_id);
        writer.delete_term(term);

        writer
            .add_document(doc!(
                self.chunk_id_field => chunk.chunk_id.clone(),
                self.doc_id_field => chunk.doc_id.clone(),
                self.chunk_index_field => chunk.chunk_index as u64,
                self.source_path_field => chunk.source_path.clone(),
                self.text_field => chunk.text.clone(),
            ))
            .map_err(|e| LexicalIndexError::InsertError(e.to_string()))?;

        Ok(())
    }

    fn commit(&self) -> Result<(), LexicalIndexError> {
        let mut writer = self.writer.lock().unwrap();
        writer
            .commit()
            .map_err(|e| LexicalIndexError::InsertError(e.to_string()))?;
        drop(writer);

        self.reader
            .reload()
            .map_err(|e| LexicalIndexError::SearchError(e.to_string()))?;

        Ok(())
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalHit>, LexicalIndexError> {
        let Some((parsed, limit)) = self.plan_query(query, limit) else {
            return Ok(Vec::new());
        };

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(limit))
            .map_err(|e| LexicalIndexError::SearchError(e.to_string()))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            hits.push(self.materialize(&searcher, score, address)?);
        }

        Ok(hits)
    }

    fn len(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }
}

/// Quote the whole query as a phrase; inner quotes would terminate the phrase
/// early, so they are blanked out.
fn escape_literal(query: &str) -> String {
    format!("\"{}\"", query.replace('"', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(doc: &str, idx: usize, text: &str) -> Chunk {
        Chunk::new(doc, idx, text, format!("/docs/{doc}.txt"))
    }

    #[test]
    fn test_index_creation() {
        let temp = TempDir::new().unwrap();
        let index = TantivyLexicalIndex::new(temp.path().join("lex")).unwrap();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let temp = TempDir::new().unwrap();
        let index = TantivyLexicalIndex::new(temp.path().join("lex")).unwrap();

        index
            .upsert(&chunk("a", 0, "The quick brown fox jumps over the lazy dog"))
            .unwrap();
        index
            .upsert(&chunk("a", 1, "A fast red fox leaps above a sleepy canine"))
            .unwrap();
        index
            .upsert(&chunk("b", 0, "Rust systems programming tutorial"))
            .unwrap();
        index.commit().unwrap();

        assert_eq!(index.len(), 3);

        let hits = index.search("fox", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].chunk.doc_id == "a");

        let hits = index.search("rust", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, "b:0");
        assert_eq!(hits[0].chunk.source_path, "/docs/b.txt");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let index = TantivyLexicalIndex::new(temp.path().join("lex")).unwrap();

        let c = chunk("a", 0, "identical payload resubmitted");
        index.upsert(&c).unwrap();
        index.commit().unwrap();
        index.upsert(&c).unwrap();
        index.upsert(&c).unwrap();
        index.commit().unwrap();

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_malformed_query_falls_back_to_literal() {
        let temp = TempDir::new().unwrap();
        let index = TantivyLexicalIndex::new(temp.path().join("lex")).unwrap();

        index
            .upsert(&chunk("a", 0, "grouped AND terms appear here"))
            .unwrap();
        index.commit().unwrap();

        // Unbalanced parenthesis is rejected by the parser; the literal
        // phrase fallback must not error
        let result = index.search("grouped AND (terms", 10);
        assert!(result.is_ok());
    }

    #[test]
    fn test_search_empty_index() {
        let temp = TempDir::new().unwrap();
        let index = TantivyLexicalIndex::new(temp.path().join("lex")).unwrap();
        let hits = index.search("anything", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_reload_existing_index() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lex");

        {
            let index = TantivyLexicalIndex::new(path.clone()).unwrap();
            index.upsert(&chunk("a", 0, "persisted document")).unwrap();
            index.commit().unwrap();
        }

        {
            let index = TantivyLexicalIndex::new(path).unwrap();
            assert_eq!(index.len(), 1);
            let hits = index.search("persisted", 10).unwrap();
            assert_eq!(hits.len(), 1);
        }
    }
}
