//! HNSW vector index for dense similarity search
use crate::index::DenseIndex;
use crate::retrieval::{Chunk, RetrievalHit};
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Vector contains non-finite values")]
    NonFiniteVector,

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    SnapshotError(String),
}

/// On-disk record: one indexed chunk with its embedding.
#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// In-memory HNSW index over chunk embeddings.
///
/// Uses cosine distance; scores returned to callers are similarities (higher
/// is better). Upserts are idempotent by chunk id: a duplicate submission
/// refreshes the stored payload without re-inserting the vector, since chunk
/// ids are derived deterministically from content.
pub struct HnswVectorIndex {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    dimension: usize,
    ef_search: usize,
    /// chunk_id -> internal HNSW id
    ids: RwLock<HashMap<String, usize>>,
    /// internal HNSW id -> chunk payload
    chunks: RwLock<Vec<Chunk>>,
    /// internal HNSW id -> embedding, retained for snapshots
    vectors: RwLock<Vec<Vec<f32>>>,
}

impl HnswVectorIndex {
    /// Create a new index.
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match the embedding model)
    /// * `ef_construction` - HNSW construction parameter
    /// * `m` - HNSW connections per layer
    /// * `ef_search` - HNSW search-time recall parameter
    pub fn new(
        dimension: usize,
        ef_construction: usize,
        m: usize,
        ef_search: usize,
    ) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::InitializationError(
                "dimension must be greater than 0".to_string(),
            ));
        }

        let index = Hnsw::<f32, DistCosine>::new(m, dimension, ef_construction, 200, DistCosine);

        Ok(Self {
            index: RwLock::new(index),
            dimension,
            ef_search,
            ids: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
            vectors: RwLock::new(Vec::new()),
        })
    }

    /// Create an index, restoring a previous snapshot if one exists at `path`.
    ///
    /// The HNSW graph is not serialized; it is rebuilt by re-inserting the
    /// stored embeddings, which is deterministic for the corpus sizes this
    /// index targets.
    pub fn load_or_create(
        path: &Path,
        dimension: usize,
        ef_construction: usize,
        m: usize,
        ef_search: usize,
    ) -> Result<Self, VectorIndexError> {
        let index = Self::new(dimension, ef_construction, m, ef_search)?;

        if path.exists() {
            let file = std::fs::File::open(path)?;
            let records: Vec<SnapshotRecord> = serde_json::from_reader(file)
                .map_err(|e| VectorIndexError::SnapshotError(e.to_string()))?;

            tracing::debug!(records = records.len(), "Restoring vector index snapshot");
            for record in records {
                index.upsert(&record.chunk, &record.vector)?;
            }
        }

        Ok(index)
    }

    /// Write all indexed chunks and their embeddings to `path`.
    pub fn save(&self, path: &Path) -> Result<(), VectorIndexError> {
        let chunks = self.chunks.read().unwrap();
        let vectors = self.vectors.read().unwrap();

        let records: Vec<SnapshotRecord> = chunks
            .iter()
            .zip(vectors.iter())
            .map(|(chunk, vector)| SnapshotRecord {
                chunk: chunk.clone(),
                vector: vector.clone(),
            })
            .collect();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(file, &records)
            .map_err(|e| VectorIndexError::SnapshotError(e.to_string()))?;

        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn validate(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(VectorIndexError::NonFiniteVector);
        }
        Ok(())
    }
}

impl DenseIndex for HnswVectorIndex {
    fn upsert(&self, chunk: &Chunk, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.validate(vector)?;

        let mut ids = self.ids.write().unwrap();
        let mut chunks = self.chunks.write().unwrap();
        let mut vectors = self.vectors.write().unwrap();

        if let Some(&internal) = ids.get(&chunk.chunk_id) {
            // Chunk ids are content-derived, so the vector for a repeated id
            // is unchanged; refresh the payload only.
            chunks[internal] = chunk.clone();
            return Ok(());
        }

        let internal = chunks.len();
        let index = self.index.write().unwrap();
        index.insert((&vector.to_vec(), internal));
        ids.insert(chunk.chunk_id.clone(), internal);
        chunks.push(chunk.clone());
        vectors.push(vector.to_vec());

        Ok(())
    }

    fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievalHit>, VectorIndexError> {
        self.validate(vector)?;

        let chunks = self.chunks.read().unwrap();
        if chunks.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let index = self.index.read().unwrap();
        let neighbors = index.search(vector, limit, self.ef_search);

        let hits = neighbors
            .into_iter()
            .filter_map(|n| {
                chunks.get(n.d_id).map(|chunk| {
                    // Convert cosine distance to similarity
                    RetrievalHit::new(chunk.clone(), 1.0 - n.distance)
                })
            })
            .collect();

        Ok(hits)
    }

    fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(doc: &str, idx: usize) -> Chunk {
        Chunk::new(doc, idx, format!("chunk {idx} of {doc}"), "/tmp/doc.txt")
    }

    fn basis_vector(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_index_creation() {
        let index = HnswVectorIndex::new(384, 200, 16, 50).unwrap();
        assert_eq!(index.dimension(), 384);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let index = HnswVectorIndex::new(8, 200, 16, 50).unwrap();

        index.upsert(&chunk("a", 0), &basis_vector(8, 0)).unwrap();
        index.upsert(&chunk("a", 1), &basis_vector(8, 1)).unwrap();
        let mut near = basis_vector(8, 0);
        near[1] = 0.1;
        index.upsert(&chunk("a", 2), &near).unwrap();

        assert_eq!(index.len(), 3);

        let hits = index.search(&basis_vector(8, 0), 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].chunk.chunk_id == "a:0" || hits[0].chunk.chunk_id == "a:2");
        assert!(hits[0].score > 0.8);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let index = HnswVectorIndex::new(4, 200, 16, 50).unwrap();
        let c = chunk("a", 0);
        let v = basis_vector(4, 0);

        index.upsert(&c, &v).unwrap();
        index.upsert(&c, &v).unwrap();
        index.upsert(&c, &v).unwrap();

        assert_eq!(index.len(), 1);

        let hits = index.search(&v, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, "a:0");
    }

    #[test]
    fn test_dimension_validation() {
        let index = HnswVectorIndex::new(8, 200, 16, 50).unwrap();
        let result = index.upsert(&chunk("a", 0), &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidDimension { expected: 8, actual: 2 })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let index = HnswVectorIndex::new(2, 200, 16, 50).unwrap();
        let result = index.upsert(&chunk("a", 0), &[f32::NAN, 1.0]);
        assert!(matches!(result, Err(VectorIndexError::NonFiniteVector)));

        let result = index.search(&[f32::INFINITY, 0.0], 5);
        assert!(matches!(result, Err(VectorIndexError::NonFiniteVector)));
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("vectors.json");

        {
            let index = HnswVectorIndex::new(4, 200, 16, 50).unwrap();
            index.upsert(&chunk("a", 0), &basis_vector(4, 0)).unwrap();
            index.upsert(&chunk("a", 1), &basis_vector(4, 1)).unwrap();
            index.save(&path).unwrap();
        }

        let index = HnswVectorIndex::load_or_create(&path, 4, 200, 16, 50).unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.search(&basis_vector(4, 1), 1).unwrap();
        assert_eq!(hits[0].chunk.chunk_id, "a:1");
    }

    #[test]
    fn test_load_without_snapshot_creates_empty_index() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("missing.json");

        let index = HnswVectorIndex::load_or_create(&path, 4, 200, 16, 50).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_index_returns_no_hits() {
        let index = HnswVectorIndex::new(4, 200, 16, 50).unwrap();
        let hits = index.search(&basis_vector(4, 0), 5).unwrap();
        assert!(hits.is_empty());
    }
}
