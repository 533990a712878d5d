//! Embedding generation
//!
//! The retrieval core treats embedding generation as an external
//! collaborator behind the `EmbeddingProvider` trait; the bundled
//! implementation runs fastembed locally.

mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
