use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Sibyl application
#[derive(Error, Debug)]
pub enum SibylError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Chunking errors
    #[error(transparent)]
    Chunking(#[from] crate::chunking::ChunkError),

    /// Embedding provider errors
    #[error(transparent)]
    Embedding(#[from] crate::embedding::EmbeddingError),

    /// Hybrid search errors
    #[error(transparent)]
    Search(#[from] crate::retrieval::SearchError),

    /// Dense vector index errors
    #[error(transparent)]
    VectorIndex(#[from] crate::index::VectorIndexError),

    /// Lexical index errors
    #[error(transparent)]
    LexicalIndex(#[from] crate::index::LexicalIndexError),

    /// Ingestion errors
    #[error(transparent)]
    Ingest(#[from] crate::ingest::IngestError),

    /// Answer generation errors
    #[error(transparent)]
    Generation(#[from] crate::generation::GenerationError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Sibyl operations
pub type Result<T> = std::result::Result<T, SibylError>;
