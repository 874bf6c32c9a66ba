use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use docsearch_core::config::{RetrievalSettings, Settings, VectorBackend};
use docsearch_core::error::{Error, Result};
use docsearch_core::types::{Chunk, ScoredChunk};
use docsearch_embed::get_default_embedder;
use docsearch_text::{KeywordIndex, KeywordStats};
use docsearch_vector::{FlatVectorStore, LanceVectorStore, VectorIndex, VectorStats, VectorStore};

use crate::fusion::{FusionRanker, FusionWeights};
use crate::marker::MarkerFile;

/// Per-call overrides; unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchParams {
    pub k: Option<usize>,
    pub dense_weight: Option<f32>,
    pub sparse_weight: Option<f32>,
}

impl SearchParams {
    pub fn top_k(k: usize) -> Self {
        Self { k: Some(k), ..Self::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrieverStats {
    pub dense: VectorStats,
    pub sparse: KeywordStats,
    /// A previous dual-index write did not finish; the indexes may disagree.
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub dense: usize,
    pub sparse: usize,
}

/// Facade over the dense and sparse indexes.
///
/// `index_chunks` and `reset` are exclusive; `search` and `stats` may run
/// concurrently with each other.
pub struct HybridRetriever {
    dense: Arc<VectorIndex>,
    sparse: Arc<KeywordIndex>,
    ranker: FusionRanker,
    marker: MarkerFile,
    interrupted: AtomicBool,
    gate: RwLock<()>,
}

impl HybridRetriever {
    pub fn new(dense: VectorIndex, sparse: KeywordIndex, settings: RetrievalSettings) -> Self {
        let dense = Arc::new(dense);
        let sparse = Arc::new(sparse);
        let marker = MarkerFile::beside(sparse.path());
        let interrupted = marker.exists();
        if interrupted {
            match marker.read() {
                Ok(Some(m)) => warn!(
                    started_at = %m.started_at,
                    chunks = m.chunk_count,
                    "previous indexing run did not finish; dense and sparse indexes may disagree"
                ),
                _ => warn!(path = %marker.path().display(), "found unreadable indexing marker"),
            }
        }
        let ranker = FusionRanker::new(Arc::clone(&dense), Arc::clone(&sparse), settings);
        info!("initialized hybrid retriever");
        Self { dense, sparse, ranker, marker, interrupted: AtomicBool::new(interrupted), gate: RwLock::new(()) }
    }

    /// Build the configured stack: embedder, vector store selected by
    /// `index.backend` under `index.dense_path`, keyword index at
    /// `index.sparse_path`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = get_default_embedder(&settings.embedding)?;
        let index = &settings.index;
        let store: Arc<dyn VectorStore> = match index.backend {
            VectorBackend::Lance => {
                Arc::new(LanceVectorStore::open(&index.dense_path, &index.collection, embedder.dim()).await?)
            }
            VectorBackend::Flat => Arc::new(FlatVectorStore::open(&index.dense_path, &index.collection)?),
        };
        let dense = VectorIndex::new(store, embedder).with_batch_size(settings.embedding.batch_size);
        let sparse = KeywordIndex::new(&settings.index.sparse_path);
        Ok(Self::new(dense, sparse, settings.retrieval))
    }

    pub fn settings(&self) -> &RetrievalSettings {
        self.ranker.settings()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Write `chunks` to both indexes under the indexing marker.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        let _write = self.gate.write().await;
        if chunks.is_empty() {
            warn!("no chunks to index");
            return Ok(IndexReport::default());
        }
        info!("indexing chunks in hybrid retriever");
        self.marker.write(chunks.len())?;
        self.interrupted.store(true, Ordering::SeqCst);

        let dense = self.dense.index(chunks).await?;

        let sparse_index = Arc::clone(&self.sparse);
        let owned = chunks.to_vec();
        let persisted = tokio::task::spawn_blocking(move || sparse_index.index(&owned))
            .await
            .map_err(|e| Error::Operation(format!("sparse indexing task failed: {e}")))?;

        if persisted {
            self.marker.clear()?;
            self.interrupted.store(false, Ordering::SeqCst);
            info!("hybrid indexing completed");
        } else {
            error!(marker = %self.marker.path().display(), "keyword index was not persisted; keeping indexing marker");
        }
        Ok(IndexReport { dense, sparse: chunks.len() })
    }

    /// Search with the configured `top_k_final` and weights.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.search_with(query, SearchParams::default()).await
    }

    pub async fn search_with(&self, query: &str, params: SearchParams) -> Result<Vec<ScoredChunk>> {
        let _read = self.gate.read().await;
        let defaults = self.ranker.default_weights();
        let weights = FusionWeights {
            dense: params.dense_weight.unwrap_or(defaults.dense),
            sparse: params.sparse_weight.unwrap_or(defaults.sparse),
        };
        let k = params.k.unwrap_or(self.ranker.settings().top_k_final);
        let results = self.ranker.search(query, k, weights).await?;
        info!(count = results.len(), "hybrid search returned results");
        Ok(results)
    }

    /// Clear both indexes and any indexing marker.
    pub async fn reset(&self) -> Result<()> {
        let _write = self.gate.write().await;
        self.dense.reset().await?;
        self.sparse.reset()?;
        self.marker.clear()?;
        self.interrupted.store(false, Ordering::SeqCst);
        info!("hybrid retriever reset completed");
        Ok(())
    }

    pub async fn stats(&self) -> Result<RetrieverStats> {
        let _read = self.gate.read().await;
        let dense = self.dense.stats().await?;
        let sparse_index = Arc::clone(&self.sparse);
        let sparse = tokio::task::spawn_blocking(move || sparse_index.stats())
            .await
            .map_err(|e| Error::Operation(format!("sparse stats task failed: {e}")))?;
        Ok(RetrieverStats { dense, sparse, interrupted: self.is_interrupted() })
    }
}
