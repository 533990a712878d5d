//! Citation-grounded answer generation
//!
//! Turns a ranked context set into a structured prompt with a parallel
//! citation map, and composes hybrid retrieval with a generation
//! collaborator. The language-model call itself lives behind the
//! `GenerationProvider` trait; only its contract (grounded, cited text) is
//! owned here.

mod engine;
mod prompt;
mod provider;

pub use engine::{AnswerEngine, AnswerError, GroundedAnswer, StreamedAnswer};
pub use prompt::{build_prompt, Citation, GroundedPrompt};
pub use provider::{DeltaStream, GenerationError, GenerationProvider};
