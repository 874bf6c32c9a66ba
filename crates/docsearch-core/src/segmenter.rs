//! Document segmentation: section grouping plus recursive-separator splitting.
//!
//! A document is grouped into sections at every heading, each section's text
//! is joined with newlines and split into chunks of at most `chunk_size`
//! characters (a single unsplittable piece may exceed it only when no
//! separator applies). Adjacent chunks of one section share up to
//! `chunk_overlap` characters.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document, INTRODUCTION_SECTION};

/// Separators tried in order; the empty separator hard-cuts into characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursive character splitter with overlap between adjacent pieces.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must be positive".into()));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({chunk_overlap}) is larger than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge_pieces(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge_pieces(&good));
        }
        chunks
    }

    /// Greedily pack pieces up to the budget; on each emit keep a tail no
    /// longer than the overlap as the start of the next chunk.
    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(total, budget = self.chunk_size, "created a chunk longer than the budget");
                }
                if !window.is_empty() {
                    if let Some(joined) = join_trimmed(window.iter().map(|(s, _)| *s)) {
                        out.push(joined);
                    }
                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        match window.pop_front() {
                            Some((_, dropped)) => total -= dropped,
                            None => break,
                        }
                    }
                }
            }
            window.push_back((piece.as_str(), len));
            total += len;
        }
        if let Some(joined) = join_trimmed(window.iter().map(|(s, _)| *s)) {
            out.push(joined);
        }
        out
    }
}

fn join_trimmed<'a>(parts: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined: String = parts.collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. Empty pieces are dropped; an empty separator yields chars.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.into_iter().filter(|p| !p.is_empty()).map(str::to_string).collect()
}

/// Turns documents into ordered chunk lists with stable identifiers.
#[derive(Debug, Clone)]
pub struct Segmenter {
    splitter: RecursiveSplitter,
}

impl Segmenter {
    pub fn new(settings: &ChunkingSettings) -> Result<Self> {
        Ok(Self { splitter: RecursiveSplitter::new(settings.chunk_size, settings.chunk_overlap)? })
    }

    pub fn segment_all(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all = Vec::new();
        for doc in documents {
            let chunks = self.segment(doc);
            debug!(document = %doc.name, chunks = chunks.len(), "segmented document");
            all.extend(chunks);
        }
        info!(documents = documents.len(), chunks = all.len(), "segmentation finished");
        all
    }

    /// Chunk one document. Identical input always yields identical ids in the
    /// same order; the id counter runs across sections.
    pub fn segment(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut counter = 0usize;
        for (title, texts) in group_sections(doc) {
            let section_text = texts.join("\n");
            let pieces = self.splitter.split_text(&section_text);
            let count = pieces.len();
            for (i, text) in pieces.into_iter().enumerate() {
                chunks.push(Chunk {
                    id: format!("{}_chunk_{}", doc.name, counter),
                    source: doc.name.clone(),
                    file_path: doc.path.clone(),
                    section_title: title.to_string(),
                    text,
                    chunk_index: i,
                    section_chunk_count: count,
                });
                counter += 1;
            }
        }
        chunks
    }
}

/// Group non-empty segments into `(title, texts)` runs, one per heading, in
/// document order. Leading body text goes under [`INTRODUCTION_SECTION`].
fn group_sections(doc: &Document) -> Vec<(&str, Vec<&str>)> {
    let mut sections: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut current: Option<(&str, Vec<&str>)> = None;
    for seg in doc.segments.iter().filter(|s| !s.text.trim().is_empty()) {
        if seg.is_heading {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some((seg.text.trim(), Vec::new()));
        } else {
            current
                .get_or_insert_with(|| (INTRODUCTION_SECTION, Vec::new()))
                .1
                .push(seg.text.trim());
        }
    }
    sections.extend(current);
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(size, overlap).expect("valid splitter")
    }

    #[test]
    fn separator_is_attached_to_following_piece() {
        assert_eq!(split_keeping_separator("a b c", " "), vec!["a", " b", " c"]);
        assert_eq!(split_keeping_separator(" a", " "), vec![" a"]);
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn short_text_is_one_chunk() {
        let s = splitter(1000, 150);
        assert_eq!(s.split_text("Hello world."), vec!["Hello world."]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let s = splitter(10, 2);
        assert!(s.split_text("").is_empty());
        assert!(s.split_text("   \n  ").is_empty());
    }

    #[test]
    fn words_are_packed_with_overlap() {
        let s = splitter(10, 4);
        let chunks = s.split_text("aaa bbb ccc ddd eee");
        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd", "ddd eee"]);
    }

    #[test]
    fn paragraphs_are_tried_before_lines() {
        let s = splitter(12, 0);
        let chunks = s.split_text("first para\n\nsecond para");
        assert_eq!(chunks, vec!["first para", "second para"]);
    }

    #[test]
    fn unbroken_text_is_hard_cut() {
        let s = splitter(4, 0);
        assert_eq!(s.split_text("abcdefghij"), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn overlap_larger_than_size_is_rejected() {
        assert!(RecursiveSplitter::new(10, 11).is_err());
        assert!(RecursiveSplitter::new(0, 0).is_err());
    }

    #[test]
    fn sections_follow_headings() {
        let mut doc = Document::new("guide.docx");
        doc.push_paragraph("Preface text.")
            .push_heading("Setup", 1)
            .push_paragraph("Install it.")
            .push_heading("Empty", 2)
            .push_heading("Usage", 1)
            .push_paragraph("Run it.");
        let groups = group_sections(&doc);
        let titles: Vec<&str> = groups.iter().map(|(t, _)| *t).collect();
        assert_eq!(titles, vec![INTRODUCTION_SECTION, "Setup", "Empty", "Usage"]);
        assert!(groups[2].1.is_empty());
    }

    #[test]
    fn chunk_ids_count_across_sections() {
        let mut doc = Document::new("guide.docx");
        doc.push_heading("A", 1).push_paragraph("one").push_heading("B", 1).push_paragraph("two");
        let seg = Segmenter::new(&ChunkingSettings::default()).expect("segmenter");
        let chunks = seg.segment(&doc);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["guide.docx_chunk_0", "guide.docx_chunk_1"]);
        assert_eq!(chunks[1].section_title, "B");
        assert_eq!(chunks[1].chunk_index, 0);
        assert_eq!(chunks[1].section_chunk_count, 1);
    }
}
