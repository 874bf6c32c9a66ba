//! On-disk marker for an in-flight dual-index write.
//!
//! The dense and sparse indexes have no shared transaction. The marker is
//! written before either index is touched and removed only after both
//! succeeded, so a marker found at startup means the indexes may disagree and
//! a full reindex is needed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docsearch_core::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingMarker {
    pub started_at: DateTime<Utc>,
    pub chunk_count: usize,
}

#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    /// Marker living next to the keyword index file: `<sparse_path>.indexing`.
    pub fn beside(index_path: &Path) -> Self {
        let mut path = index_path.as_os_str().to_owned();
        path.push(".indexing");
        Self { path: PathBuf::from(path) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// The marker contents; `None` when absent. An unreadable marker still
    /// counts as present.
    pub fn read(&self) -> Result<Option<IndexingMarker>> {
        if !self.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map(Some).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn write(&self, chunk_count: usize) -> Result<IndexingMarker> {
        let marker = IndexingMarker { started_at: Utc::now(), chunk_count };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec(&marker)?)?;
        Ok(marker)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
