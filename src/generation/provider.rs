//! Generation provider contract

use crate::generation::GroundedPrompt;
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation provider failed: {0}")]
    ProviderError(String),

    #[error("Streaming failed: {0}")]
    StreamError(String),
}

/// A finite, single-pass sequence of text deltas. Not restartable.
pub type DeltaStream = BoxStream<'static, Result<String, GenerationError>>;

/// Answer-synthesis collaborator.
///
/// Implementations must keep the determinism knob (temperature or
/// equivalent) low so grounded answers stay consistent across runs. Provider
/// failures are surfaced, never swallowed, since they invalidate the whole
/// answer.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce the complete answer text for a structured prompt.
    async fn complete(&self, prompt: &GroundedPrompt) -> Result<String, GenerationError>;

    /// Produce the answer incrementally as text deltas.
    async fn stream(&self, prompt: &GroundedPrompt) -> Result<DeltaStream, GenerationError>;
}
