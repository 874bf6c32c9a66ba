//! Domain types shared by the segmenter, both indexes and the fusion ranker.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Section title used for segments that precede the first heading.
pub const INTRODUCTION_SECTION: &str = "Introduction";

/// One paragraph-like unit of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub position: usize,
    #[serde(default)]
    pub is_heading: bool,
    /// Heading depth, 0 for body text.
    #[serde(default)]
    pub heading_level: u8,
    /// Title of the enclosing section, or [`INTRODUCTION_SECTION`].
    #[serde(default = "default_section")]
    pub section: String,
}

fn default_section() -> String {
    INTRODUCTION_SECTION.to_string()
}

/// A source document as an ordered sequence of segments. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name; chunk identifiers are derived from it.
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    pub segments: Vec<Segment>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), path: None, segments: Vec::new() }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append a body paragraph under the most recent heading.
    pub fn push_paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        let section = self.current_section();
        let position = self.segments.len();
        self.segments.push(Segment { text: text.into(), position, is_heading: false, heading_level: 0, section });
        self
    }

    /// Append a heading; it opens a new section titled with its own text.
    pub fn push_heading(&mut self, text: impl Into<String>, level: u8) -> &mut Self {
        let text = text.into();
        let position = self.segments.len();
        self.segments.push(Segment { section: text.clone(), text, position, is_heading: true, heading_level: level.max(1) });
        self
    }

    fn current_section(&self) -> String {
        self.segments
            .iter()
            .rev()
            .find(|s| s.is_heading)
            .map(|s| s.text.clone())
            .unwrap_or_else(default_section)
    }
}

/// The indexable unit produced by the segmenter.
///
/// - `id`: `{source}_chunk_{n}`, `n` counting across the whole document
/// - `source`: document name
/// - `file_path`: original path, when known
/// - `section_title`: heading of the section the text came from
/// - `chunk_index`/`section_chunk_count`: position among the section's chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: String,
    #[serde(default)]
    pub file_path: Option<String>,
    pub section_title: String,
    pub text: String,
    pub chunk_index: usize,
    pub section_chunk_count: usize,
}

/// Indicates which retrieval channel produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Dense,
    Sparse,
    Hybrid,
}

impl std::fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RetrievalMethod::Dense => "dense",
            RetrievalMethod::Sparse => "sparse",
            RetrievalMethod::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// A chunk together with the score a retrieval channel assigned to it.
///
/// `score` is cosine similarity for dense hits, the raw BM25 score for sparse
/// hits and the fused RRF score for hybrid hits. Ranks are 1-based positions
/// in the respective channel's list, absent when that channel missed the chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub method: RetrievalMethod,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dense_rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_rank: Option<usize>,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, method: RetrievalMethod, score: f32) -> Self {
        Self { chunk, method, score, dense_rank: None, sparse_rank: None }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}
