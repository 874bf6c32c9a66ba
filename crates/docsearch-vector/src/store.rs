//! Vector storage backends.
//!
//! # Storage Model
//!
//! Each stored item consists of:
//! - Chunk: the original text and metadata, keyed by chunk id
//! - Vector: the embedding of the chunk text
//!
//! Stores compare vectors by cosine distance (`1 - cosine similarity`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docsearch_core::error::Result;
use docsearch_core::types::Chunk;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl VectorRecord {
    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// A stored chunk with its cosine distance to the query vector.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Trait for vector storage backends
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Insert records; an existing id is overwritten.
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// The `k` nearest records, closest first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>>;

    async fn count(&self) -> Result<usize>;

    /// Drop every record, leaving an empty collection.
    async fn reset(&self) -> Result<()>;
}

/// Returns a value in [0, 2]; a zero vector is treated as orthogonal.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}
