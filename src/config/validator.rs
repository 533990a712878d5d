use crate::config::Config;
use crate::error::{Result, SibylError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_generation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SibylError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory path cannot be empty",
            ));
        }

        if config.storage.max_upload_mb == 0 {
            errors.push(ValidationError::new(
                "storage.max_upload_mb",
                "Upload cap must be greater than 0",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if config.chunking.overlap >= config.chunking.chunk_size && config.chunking.chunk_size > 0 {
            errors.push(ValidationError::new(
                "chunking.overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    config.chunking.overlap, config.chunking.chunk_size
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Embedding model name cannot be empty",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.vector_dim == 0 {
            errors.push(ValidationError::new(
                "indexing.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M parameter must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let r = &config.retrieval;

        if r.dense_limit == 0 {
            errors.push(ValidationError::new(
                "retrieval.dense_limit",
                "Dense search limit must be greater than 0",
            ));
        }

        if r.lexical_limit == 0 {
            errors.push(ValidationError::new(
                "retrieval.lexical_limit",
                "Lexical search limit must be greater than 0",
            ));
        }

        if r.final_top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.final_top_k",
                "Result count must be greater than 0",
            ));
        }

        if r.pool_multiplier == 0 {
            errors.push(ValidationError::new(
                "retrieval.pool_multiplier",
                "Pool multiplier must be greater than 0",
            ));
        }

        if r.rrf_k <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_k",
                "RRF constant must be positive",
            ));
        }

        if !(0.0..=1.0).contains(&r.mmr_lambda) {
            errors.push(ValidationError::new(
                "retrieval.mmr_lambda",
                format!("MMR lambda must be in [0, 1], got {}", r.mmr_lambda),
            ));
        }

        if r.search_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "retrieval.search_timeout_secs",
                "Search timeout must be greater than 0",
            ));
        }
    }

    fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.generation.enabled {
            if config.generation.model.is_empty() {
                errors.push(ValidationError::new(
                    "generation.model",
                    "Model name cannot be empty when generation is enabled",
                ));
            }

            if config.generation.api_key_env.is_empty() {
                errors.push(ValidationError::new(
                    "generation.api_key_env",
                    "API key environment variable cannot be empty when generation is enabled",
                ));
            }
        }

        if !(0.0..=2.0).contains(&config.generation.temperature) {
            errors.push(ValidationError::new(
                "generation.temperature",
                format!(
                    "Temperature must be in [0, 2], got {}",
                    config.generation.temperature
                ),
            ));
        }
    }
}
