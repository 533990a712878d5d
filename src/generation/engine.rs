//! Answer engine composing hybrid retrieval with grounded generation

use crate::generation::{build_prompt, Citation, DeltaStream, GenerationError, GenerationProvider};
use crate::retrieval::{Chunk, HybridRetriever, SearchError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// A generated answer plus everything needed to audit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    /// Citation map resolving `[n]` markers in the answer
    pub citations: Vec<Citation>,
    /// The exact ordered context set the answer was generated from
    pub contexts: Vec<Chunk>,
}

/// The streaming counterpart: citation map and contexts are available up
/// front, the answer arrives as deltas.
pub struct StreamedAnswer {
    pub deltas: DeltaStream,
    pub citations: Vec<Citation>,
    pub contexts: Vec<Chunk>,
}

/// Composes retrieval, prompt construction and generation.
pub struct AnswerEngine {
    retriever: Arc<HybridRetriever>,
    generator: Arc<dyn GenerationProvider>,
}

impl AnswerEngine {
    pub fn new(retriever: Arc<HybridRetriever>, generator: Arc<dyn GenerationProvider>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Answer a question from the corpus.
    pub async fn answer(&self, query: &str, top_k: usize) -> Result<GroundedAnswer, AnswerError> {
        let contexts = self.retriever.retrieve(query, top_k).await?;
        let (prompt, citations) = build_prompt(query, &contexts);

        let answer = self.generator.complete(&prompt).await?;

        Ok(GroundedAnswer {
            answer,
            citations,
            contexts,
        })
    }

    /// Streaming variant. Retrieval fully completes before the first delta
    /// is produced, since the prompt requires the complete ordered context
    /// set; only the generated text itself is incremental.
    pub async fn answer_stream(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<StreamedAnswer, AnswerError> {
        let contexts = self.retriever.retrieve(query, top_k).await?;
        let (prompt, citations) = build_prompt(query, &contexts);

        let deltas = self.generator.stream(&prompt).await?;

        Ok(StreamedAnswer {
            deltas,
            citations,
            contexts,
        })
    }
}
