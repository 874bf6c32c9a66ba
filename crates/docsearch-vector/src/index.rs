use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;
use docsearch_core::types::{Chunk, RetrievalMethod, ScoredChunk};

use crate::store::{VectorRecord, VectorStore};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VectorStats {
    pub total_chunks: usize,
    pub collection_name: String,
}

/// Dense index: embeds chunk text in batches and delegates storage and
/// nearest-neighbour lookup to a [`VectorStore`].
#[derive(Clone)]
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embed `chunks` batch by batch, then store them in a single write.
    /// Returns the number of chunks written; nothing is stored if any batch
    /// fails to embed.
    #[instrument(skip_all, fields(chunks = chunks.len(), collection = %self.store.name()))]
    pub async fn index(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            warn!("no chunks to index");
            return Ok(0);
        }
        info!(batch_size = self.batch_size, embedder = %self.embedder.id(), "starting dense indexing");
        let mut records = Vec::with_capacity(chunks.len());
        for (n, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for a batch of {}",
                    vectors.len(),
                    batch.len()
                )));
            }
            records.extend(batch.iter().cloned().zip(vectors).map(|(chunk, vector)| VectorRecord { chunk, vector }));
            debug!(batch = n + 1, embedded = records.len(), "embedded dense batch");
        }
        let written = records.len();
        self.store.add(records).await?;
        info!(written, "dense indexing finished");
        Ok(written)
    }

    /// Nearest chunks to `query`, most similar first. `k` is clamped to the
    /// stored count; an empty collection yields no results.
    #[instrument(skip_all, fields(k = k))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let count = self.store.count().await?;
        if count == 0 {
            warn!(collection = %self.store.name(), "vector collection is empty");
            return Ok(Vec::new());
        }
        let k = k.min(count);
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        let matches = self.store.query(&vector, k).await?;
        let results: Vec<ScoredChunk> = matches
            .into_iter()
            .map(|m| ScoredChunk::new(m.chunk, RetrievalMethod::Dense, 1.0 - m.distance))
            .collect();
        debug!(count = results.len(), "dense search returned results");
        Ok(results)
    }

    pub async fn reset(&self) -> Result<()> {
        self.store.reset().await?;
        info!(collection = %self.store.name(), "vector index reset");
        Ok(())
    }

    pub async fn stats(&self) -> Result<VectorStats> {
        Ok(VectorStats { total_chunks: self.store.count().await?, collection_name: self.store.name().to_string() })
    }
}
