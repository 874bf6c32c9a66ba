use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use docsearch_core::error::{Error, Result};

use crate::store::{cosine_distance, VectorMatch, VectorRecord, VectorStore};

#[derive(Default, Clone)]
struct Records {
    items: Vec<VectorRecord>,
    by_id: HashMap<String, usize>,
}

impl Records {
    fn from_vec(items: Vec<VectorRecord>) -> Self {
        let mut records = Self::default();
        for item in items {
            records.upsert(item);
        }
        records
    }

    fn upsert(&mut self, record: VectorRecord) {
        match self.by_id.get(record.id()) {
            Some(&pos) => self.items[pos] = record,
            None => {
                self.by_id.insert(record.id().to_string(), self.items.len());
                self.items.push(record);
            }
        }
    }
}

/// Brute-force cosine store persisted as `<dir>/<collection>.json`.
///
/// Every `add` rewrites the file, so callers should hand it whole batches
/// (as [`VectorIndex`](crate::VectorIndex) does). Meant for small corpora and
/// tests; the LanceDB backend is the default.
pub struct FlatVectorStore {
    name: String,
    path: Option<PathBuf>,
    records: RwLock<Records>,
}

impl FlatVectorStore {
    /// Open (or create) the collection file under `dir`.
    pub fn open(dir: &Path, collection: &str) -> Result<Self> {
        let path = dir.join(format!("{collection}.json"));
        let items: Vec<VectorRecord> = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("failed to read collection {}: {e}", path.display())))?
        } else {
            Vec::new()
        };
        info!(collection, path = %path.display(), count = items.len(), "opened vector collection");
        Ok(Self { name: collection.to_string(), path: Some(path), records: RwLock::new(Records::from_vec(items)) })
    }

    /// A store that never touches disk.
    pub fn in_memory(collection: &str) -> Self {
        Self { name: collection.to_string(), path: None, records: RwLock::new(Records::default()) }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `items` to the collection file off the async executor.
    async fn persist(&self, items: &[VectorRecord]) -> Result<()> {
        let Some(path) = self.path.clone() else { return Ok(()) };
        let bytes = serde_json::to_vec(items).map_err(|e| Error::Store(e.to_string()))?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|e| Error::Store(format!("collection write task failed: {e}")))?
            .map_err(|e| Error::Store(format!("failed to write collection {}: {e}", path.display())))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl VectorStore for FlatVectorStore {
    fn name(&self) -> &str {
        &self.name
    }

    /// Upserts into a copy of the collection; memory is only replaced once
    /// the copy has been written.
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let added = records.len();
        let mut next = {
            let guard = self.records.read();
            if let Some(dim) = guard.items.first().map(|r| r.vector.len()) {
                if let Some(bad) = records.iter().find(|r| r.vector.len() != dim) {
                    return Err(Error::Store(format!(
                        "vector for {} has dimension {}, collection uses {dim}",
                        bad.id(),
                        bad.vector.len()
                    )));
                }
            }
            (*guard).clone()
        };
        for record in records {
            next.upsert(record);
        }
        self.persist(&next.items).await?;
        let total = next.items.len();
        *self.records.write() = next;
        debug!(collection = %self.name, added, total, "stored vectors");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        let guard = self.records.read();
        if let Some(first) = guard.items.first() {
            if first.vector.len() != vector.len() {
                return Err(Error::Store(format!(
                    "query has dimension {}, collection uses {}",
                    vector.len(),
                    first.vector.len()
                )));
            }
        }
        let mut scored: Vec<(usize, f32)> = guard
            .items
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_distance(vector, &r.vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| VectorMatch { chunk: guard.items[i].chunk.clone(), distance })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().items.len())
    }

    async fn reset(&self) -> Result<()> {
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => info!(collection = %self.name, "vector collection removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        *self.records.write() = Records::default();
        Ok(())
    }
}
