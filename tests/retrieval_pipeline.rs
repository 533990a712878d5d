//! End-to-end retrieval pipeline tests
//!
//! Exercises ingestion, hybrid search and answer generation against real
//! HNSW and tantivy indexes in a temp directory. The embedding model is
//! replaced with a deterministic topic-vector stub so these tests run
//! offline.

use async_trait::async_trait;
use futures::StreamExt;
use sibyl::chunking::Chunker;
use sibyl::config::RetrievalConfig;
use sibyl::embedding::{EmbeddingError, EmbeddingProvider};
use sibyl::generation::{
    AnswerEngine, DeltaStream, GenerationError, GenerationProvider, GroundedPrompt,
};
use sibyl::index::{
    DenseIndex, HnswVectorIndex, LexicalIndex, TantivyLexicalIndex, VectorIndexError,
};
use sibyl::ingest::Ingestor;
use sibyl::retrieval::{Chunk, HybridRetriever, RetrievalHit, SearchError};
use std::sync::Arc;
use tempfile::TempDir;

const TOPICS: [&str; 4] = ["rust", "python", "tokio", "database"];

/// Deterministic embedder: one axis per topic word, normalized counts.
/// Texts without any topic word map to a fixed off-axis direction so cosine
/// stays well defined.
struct StubEmbedder;

impl StubEmbedder {
    fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = TOPICS
            .iter()
            .map(|t| lower.matches(t).count() as f32)
            .collect();

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return vec![0.5, 0.5, 0.5, 0.5];
        }
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(Self::vector_for(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        TOPICS.len()
    }

    fn model_name(&self) -> &str {
        "stub-topic-embedder"
    }
}

/// Dense index that claims to hold data but fails every search.
struct FailingDenseIndex;

impl DenseIndex for FailingDenseIndex {
    fn upsert(&self, _chunk: &Chunk, _vector: &[f32]) -> Result<(), VectorIndexError> {
        Ok(())
    }

    fn search(
        &self,
        _vector: &[f32],
        _limit: usize,
    ) -> Result<Vec<RetrievalHit>, VectorIndexError> {
        Err(VectorIndexError::SearchError("index offline".to_string()))
    }

    fn len(&self) -> usize {
        1
    }
}

/// Generator double: echoes a canned answer, streamed in two deltas.
struct StubGenerator;

#[async_trait]
impl GenerationProvider for StubGenerator {
    async fn complete(&self, prompt: &GroundedPrompt) -> Result<String, GenerationError> {
        Ok(format!("Answered from {} bytes of context [1]", prompt.user.len()))
    }

    async fn stream(&self, _prompt: &GroundedPrompt) -> Result<DeltaStream, GenerationError> {
        let deltas = futures::stream::iter(vec![
            Ok("Answered ".to_string()),
            Ok("in parts [1]".to_string()),
        ]);
        Ok(deltas.boxed())
    }
}

const CORPUS: [(&str, &str); 3] = [
    (
        "rust-notes.md",
        "Rust ownership rules prevent data races at compile time. The borrow \
         checker enforces aliasing XOR mutation, and lifetimes tie references \
         to the scopes that own the underlying data. Rust programs opt into \
         shared mutability explicitly through types like Mutex and RwLock.",
    ),
    (
        "tokio-notes.md",
        "Tokio is an asynchronous runtime for Rust. Tasks are scheduled onto \
         a multi-threaded work-stealing executor, and the tokio timer wheel \
         drives timeout and sleep futures. Channels coordinate tasks without \
         blocking executor threads.",
    ),
    (
        "python-notes.md",
        "Python asyncio uses a single-threaded event loop. Coroutines await \
         awaitables, and the GIL serializes bytecode execution, so CPU-bound \
         python work needs process pools rather than threads.",
    ),
];

struct Fixture {
    _temp: TempDir,
    embedder: Arc<StubEmbedder>,
    dense: Arc<HnswVectorIndex>,
    lexical: Arc<TantivyLexicalIndex>,
}

fn build_fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let embedder = Arc::new(StubEmbedder);
    let dense = Arc::new(HnswVectorIndex::new(TOPICS.len(), 200, 16, 50).unwrap());
    let lexical = Arc::new(TantivyLexicalIndex::new(temp.path().join("lexical")).unwrap());

    let ingestor = Ingestor::new(
        Chunker::new(400, 60).unwrap(),
        embedder.clone(),
        dense.clone(),
        lexical.clone(),
        64,
        25,
    );

    for (path, text) in CORPUS {
        ingestor.ingest_text(text, path).unwrap();
    }

    Fixture {
        _temp: temp,
        embedder,
        dense,
        lexical,
    }
}

fn retrieval_config() -> RetrievalConfig {
    RetrievalConfig {
        dense_limit: 20,
        lexical_limit: 50,
        final_top_k: 6,
        pool_multiplier: 3,
        rrf_k: 60.0,
        mmr_lambda: 0.7,
        search_timeout_secs: 30,
    }
}

fn retriever(fixture: &Fixture) -> HybridRetriever {
    HybridRetriever::new(
        fixture.embedder.clone(),
        fixture.dense.clone(),
        fixture.lexical.clone(),
        retrieval_config(),
    )
}

#[tokio::test]
async fn test_hybrid_search_end_to_end() {
    let fixture = build_fixture();
    let retriever = retriever(&fixture);

    let results = retriever
        .retrieve("How does the tokio runtime schedule tasks?", 2)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 2);
    assert_eq!(results[0].source_path, "tokio-notes.md");
}

#[tokio::test]
async fn test_chunk_ranked_first_by_both_legs_wins_fusion() {
    let fixture = build_fixture();
    let retriever = retriever(&fixture);

    // "tokio" dominates both the dense topic vector and the keyword match,
    // so that document must survive fusion and lead the final selection.
    let results = retriever.retrieve("tokio tokio tokio", 3).await.unwrap();

    assert_eq!(results[0].source_path, "tokio-notes.md");
}

#[tokio::test]
async fn test_dense_failure_degrades_to_lexical_only() {
    let fixture = build_fixture();
    let retriever = HybridRetriever::new(
        fixture.embedder.clone(),
        Arc::new(FailingDenseIndex),
        fixture.lexical.clone(),
        retrieval_config(),
    );

    let results = retriever
        .retrieve("python event loop?", 3)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].source_path, "python-notes.md");
}

#[tokio::test]
async fn test_empty_corpus_returns_empty_set() {
    let temp = TempDir::new().unwrap();
    let retriever = HybridRetriever::new(
        Arc::new(StubEmbedder),
        Arc::new(HnswVectorIndex::new(TOPICS.len(), 200, 16, 50).unwrap()),
        Arc::new(TantivyLexicalIndex::new(temp.path().join("lexical")).unwrap()),
        retrieval_config(),
    );

    let results = retriever.retrieve("anything at all", 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let fixture = build_fixture();
    let retriever = retriever(&fixture);

    let result = retriever.retrieve("   ", 5).await;
    assert!(matches!(result, Err(SearchError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_zero_top_k_falls_back_to_configured_default() {
    let fixture = build_fixture();
    let retriever = retriever(&fixture);

    let results = retriever.retrieve("rust ownership", 0).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= retrieval_config().final_top_k);
}

/// Counts embedding calls so tests can assert that empty ingests never
/// touch the model.
struct CountingEmbedder {
    inner: StubEmbedder,
    batch_calls: std::sync::atomic::AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: StubEmbedder,
            batch_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.batch_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl EmbeddingProvider for CountingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "counting-stub-embedder"
    }
}

#[test]
fn test_empty_text_ingests_zero_chunks_without_embedding() {
    let temp = TempDir::new().unwrap();
    let embedder = Arc::new(CountingEmbedder::new());
    let dense = Arc::new(HnswVectorIndex::new(TOPICS.len(), 200, 16, 50).unwrap());
    let lexical = Arc::new(TantivyLexicalIndex::new(temp.path().join("lexical")).unwrap());

    let ingestor = Ingestor::new(
        Chunker::new(400, 60).unwrap(),
        embedder.clone(),
        dense.clone(),
        lexical.clone(),
        64,
        25,
    );

    let receipt = ingestor.ingest_text("", "empty.txt").unwrap();

    assert_eq!(receipt.chunk_count, 0);
    assert_eq!(embedder.calls(), 0);
    assert!(dense.is_empty());
    assert!(lexical.is_empty());
}

#[test]
fn test_reingestion_is_idempotent() {
    let fixture = build_fixture();
    let ingestor = Ingestor::new(
        Chunker::new(400, 60).unwrap(),
        fixture.embedder.clone(),
        fixture.dense.clone(),
        fixture.lexical.clone(),
        64,
        25,
    );

    let before = fixture.dense.len();
    let first = ingestor.ingest_text(CORPUS[0].1, CORPUS[0].0).unwrap();
    let second = ingestor.ingest_text(CORPUS[0].1, CORPUS[0].0).unwrap();

    assert_eq!(first.doc_id, second.doc_id);
    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(fixture.dense.len(), before);
    assert_eq!(fixture.lexical.len(), before);
}

#[tokio::test]
async fn test_answer_engine_returns_citations_for_contexts() {
    let fixture = build_fixture();
    let engine = AnswerEngine::new(Arc::new(retriever(&fixture)), Arc::new(StubGenerator));

    let grounded = engine.answer("rust borrow checker", 2).await.unwrap();

    assert!(grounded.answer.contains("[1]"));
    assert_eq!(grounded.citations.len(), grounded.contexts.len());
    for (i, citation) in grounded.citations.iter().enumerate() {
        assert_eq!(citation.index, i + 1);
        assert_eq!(citation.source_path, grounded.contexts[i].source_path);
    }
}

#[tokio::test]
async fn test_answer_stream_yields_deltas_after_contexts() {
    let fixture = build_fixture();
    let engine = AnswerEngine::new(Arc::new(retriever(&fixture)), Arc::new(StubGenerator));

    let streamed = engine.answer_stream("tokio channels", 2).await.unwrap();
    assert!(!streamed.contexts.is_empty());
    assert_eq!(streamed.citations.len(), streamed.contexts.len());

    let deltas: Vec<String> = streamed
        .deltas
        .map(|d| d.unwrap())
        .collect::<Vec<_>>()
        .await;
    assert_eq!(deltas.join(""), "Answered in parts [1]");
}
