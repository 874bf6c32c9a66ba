use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{Chunk, RetrievalMethod, ScoredChunk};

use crate::bm25::Bm25Okapi;
use crate::tokenize::tokenize;

/// The three index-aligned arrays: entry `i` of each refers to the same chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordState {
    pub chunks: Vec<Chunk>,
    pub tokenized_corpus: Vec<Vec<String>>,
    pub ranking: Bm25Okapi,
}

impl KeywordState {
    pub fn build(chunks: &[Chunk]) -> Self {
        let tokenized_corpus: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();
        let ranking = Bm25Okapi::new(&tokenized_corpus);
        Self { chunks: chunks.to_vec(), tokenized_corpus, ranking }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn check_alignment(&self) -> Result<()> {
        let (c, t, r) = (self.chunks.len(), self.tokenized_corpus.len(), self.ranking.corpus_size());
        if c != t || c != r || !self.ranking.is_consistent() {
            return Err(Error::Serialization(format!(
                "keyword index arrays are misaligned: {c} chunks, {t} token lists, {r} ranked documents"
            )));
        }
        Ok(())
    }

    /// Top `k` corpus entries by descending score, ties in corpus order,
    /// non-positive scores removed after truncation.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let scores = self.ranking.get_scores(&tokenize(query));
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
        order
            .into_iter()
            .take(k)
            .filter(|i| scores[*i] > 0.0)
            .map(|i| ScoredChunk::new(self.chunks[i].clone(), RetrievalMethod::Sparse, scores[i] as f32))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordStats {
    pub total_chunks: usize,
    pub index_path: String,
}

/// BM25 keyword index persisted as one JSON file.
///
/// Writers replace the whole state; readers take a snapshot and score
/// without holding the lock.
pub struct KeywordIndex {
    path: PathBuf,
    state: RwLock<Option<Arc<KeywordState>>>,
}

impl KeywordIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: RwLock::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the index with `chunks` and persist it. Returns whether the
    /// on-disk copy was written; an empty batch leaves the index untouched.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub fn index(&self, chunks: &[Chunk]) -> bool {
        if chunks.is_empty() {
            warn!("no chunks to index");
            return true;
        }
        info!("starting BM25 indexing");
        let state = Arc::new(KeywordState::build(chunks));
        let persisted = match self.save(&state) {
            Ok(()) => {
                info!(path = %self.path.display(), "BM25 index saved");
                true
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to save BM25 index");
                false
            }
        };
        *self.state.write() = Some(state);
        info!(chunks = chunks.len(), "indexed chunks with BM25");
        persisted
    }

    #[instrument(skip_all, fields(k = k))]
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let Some(state) = self.snapshot() else {
            warn!(path = %self.path.display(), "BM25 index not initialized");
            return Vec::new();
        };
        let results = state.top_k(query, k);
        debug!(count = results.len(), "sparse search returned results");
        results
    }

    /// Clear memory and delete the persisted file.
    pub fn reset(&self) -> Result<()> {
        *self.state.write() = None;
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "BM25 index removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    pub fn stats(&self) -> KeywordStats {
        KeywordStats {
            total_chunks: self.snapshot().map(|s| s.len()).unwrap_or(0),
            index_path: self.path.to_string_lossy().to_string(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }

    /// Current state, rehydrating from disk when memory is empty.
    fn snapshot(&self) -> Option<Arc<KeywordState>> {
        if let Some(state) = self.state.read().as_ref() {
            return Some(Arc::clone(state));
        }
        let mut guard = self.state.write();
        if guard.is_none() {
            *guard = self.load().map(Arc::new);
        }
        guard.clone()
    }

    fn load(&self) -> Option<KeywordState> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "BM25 index not found");
            return None;
        }
        match read_state(&self.path) {
            Ok(state) => {
                info!(path = %self.path.display(), chunks = state.len(), "BM25 index loaded");
                Some(state)
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to load BM25 index");
                None
            }
        }
    }

    fn save(&self, state: &KeywordState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let bytes = serde_json::to_vec(state).map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<KeywordState> {
    let bytes = fs::read(path)?;
    let state: KeywordState = serde_json::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;
    state.check_alignment()?;
    Ok(state)
}
