// Weighted Reciprocal Rank Fusion (RRF)

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use docsearch_core::config::RetrievalSettings;
use docsearch_core::error::{Error, Result};
use docsearch_core::types::{RetrievalMethod, ScoredChunk};
use docsearch_text::KeywordIndex;
use docsearch_vector::VectorIndex;

/// Standard RRF k parameter value from academic literature.
///
/// Larger values flatten the difference between adjacent ranks; 60 is the
/// value recommended by Cormack, Clarke and Buettcher (SIGIR 2009).
pub const RRF_K: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub dense: f32,
    pub sparse: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { dense: 0.6, sparse: 0.4 }
    }
}

/// Merge a dense and a sparse ranked list.
///
/// RRF Formula: score(d) = sum over lists m containing d of w_m / (k + rank_m(d))
///
/// - ranks are 1-based positions in each input list
/// - a chunk keeps the data of the first list it appeared in (dense first)
/// - ties keep first-seen order
/// - only positive scores survive, then the list is cut to `top_k`
pub fn reciprocal_rank_fusion(
    dense: Vec<ScoredChunk>,
    sparse: Vec<ScoredChunk>,
    weights: FusionWeights,
    k: f32,
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut fused: Vec<ScoredChunk> = Vec::with_capacity(dense.len() + sparse.len());
    let mut slot: HashMap<String, usize> = HashMap::new();

    for (rank, result) in dense.into_iter().enumerate().map(|(i, r)| (i + 1, r)) {
        let contribution = weights.dense / (k + rank as f32);
        let pos = entry(&mut fused, &mut slot, result);
        fused[pos].score += contribution;
        fused[pos].dense_rank = Some(rank);
    }
    for (rank, result) in sparse.into_iter().enumerate().map(|(i, r)| (i + 1, r)) {
        let contribution = weights.sparse / (k + rank as f32);
        let pos = entry(&mut fused, &mut slot, result);
        fused[pos].score += contribution;
        fused[pos].sparse_rank = Some(rank);
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.retain(|r| r.score > 0.0);
    fused.truncate(top_k);
    fused
}

fn entry(fused: &mut Vec<ScoredChunk>, slot: &mut HashMap<String, usize>, result: ScoredChunk) -> usize {
    if let Some(&pos) = slot.get(result.id()) {
        return pos;
    }
    let pos = fused.len();
    slot.insert(result.id().to_string(), pos);
    fused.push(ScoredChunk::new(result.chunk, RetrievalMethod::Hybrid, 0.0));
    pos
}

/// Queries both indexes concurrently and fuses their results.
#[derive(Clone)]
pub struct FusionRanker {
    dense: Arc<VectorIndex>,
    sparse: Arc<KeywordIndex>,
    settings: RetrievalSettings,
}

impl FusionRanker {
    pub fn new(dense: Arc<VectorIndex>, sparse: Arc<KeywordIndex>, settings: RetrievalSettings) -> Self {
        Self { dense, sparse, settings }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub fn default_weights(&self) -> FusionWeights {
        FusionWeights { dense: self.settings.dense_weight, sparse: self.settings.sparse_weight }
    }

    /// Top `k` fused results. Dense failures propagate; a missing keyword
    /// index contributes nothing.
    #[instrument(skip_all, fields(k = k))]
    pub async fn search(&self, query: &str, k: usize, weights: FusionWeights) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let sparse_index = Arc::clone(&self.sparse);
        let sparse_query = query.to_string();
        let top_k_sparse = self.settings.top_k_sparse;
        let sparse_task = tokio::task::spawn_blocking(move || sparse_index.search(&sparse_query, top_k_sparse));
        let dense_future = self.dense.search(query, self.settings.top_k_dense);

        let (dense, sparse) = tokio::join!(dense_future, sparse_task);
        let mut dense = dense?;
        let sparse = sparse.map_err(|e| Error::Operation(format!("sparse search task failed: {e}")))?;

        if self.settings.enforce_similarity_threshold {
            let floor = self.settings.similarity_threshold;
            let before = dense.len();
            dense.retain(|r| r.score >= floor);
            debug!(floor, dropped = before - dense.len(), "applied dense similarity floor");
        }
        debug!(dense = dense.len(), sparse = sparse.len(), "channel results");

        Ok(reciprocal_rank_fusion(dense, sparse, weights, self.settings.rrf_k, k))
    }
}
