//! Minimal loader for plain-text and markdown sources.
//!
//! Every non-empty line becomes a segment; lines starting with `#` are
//! headings with depth equal to the number of leading `#`. `.json` files are
//! read as already-structured [`Document`]s.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::Document;

const TEXT_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every supported file below `data_dir`, in sorted path order.
    /// Unreadable files are skipped with a warning.
    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        if !data_dir.exists() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())));
        }
        let files = self.list_files(data_dir);
        info!(count = files.len(), dir = %data_dir.display(), "found source files");
        Ok(self.load_files(&files))
    }

    /// Like [`load_directory`](Self::load_directory) but stops after the
    /// first `limit` files.
    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        if !data_dir.exists() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())));
        }
        let mut files = self.list_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited to first files");
        }
        Ok(self.load_files(&files))
    }

    pub fn load_file(&self, path: &Path) -> Result<Document> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::NotFound(format!("file name of {}", path.display())))?;
        let content = read_lossy(path)?;
        if has_extension(path, &["json"]) {
            let mut doc: Document = serde_json::from_str(&content)?;
            if doc.path.is_none() {
                doc.path = Some(path.to_string_lossy().to_string());
            }
            return Ok(doc);
        }
        Ok(parse_text(&name, &content).with_path(path.to_string_lossy()))
    }

    fn load_files(&self, files: &[PathBuf]) -> Vec<Document> {
        let mut docs = Vec::with_capacity(files.len());
        for path in files {
            match self.load_file(path) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(file = %path.display(), error = %e, "failed to load document"),
            }
        }
        docs
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| has_extension(p, &TEXT_EXTENSIONS) || has_extension(p, &["json"]))
            .collect();
        files.sort();
        files
    }
}

/// Build a document from text, treating `#`-prefixed lines as headings.
pub fn parse_text(name: &str, content: &str) -> Document {
    let mut doc = Document::new(name);
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let level = line.chars().take_while(|c| *c == '#').count();
        if level > 0 {
            let title = line[level..].trim();
            if !title.is_empty() {
                doc.push_heading(title, level.min(u8::MAX as usize) as u8);
            }
        } else {
            doc.push_paragraph(line);
        }
    }
    doc
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn read_lossy(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::INTRODUCTION_SECTION;

    #[test]
    fn headings_open_sections() {
        let doc = parse_text("notes.md", "intro line\n\n# Title\nbody\n## Sub\nmore\n");
        assert_eq!(doc.segments.len(), 5);
        assert_eq!(doc.segments[0].section, INTRODUCTION_SECTION);
        assert!(doc.segments[1].is_heading);
        assert_eq!(doc.segments[1].heading_level, 1);
        assert_eq!(doc.segments[2].section, "Title");
        assert_eq!(doc.segments[3].heading_level, 2);
        assert_eq!(doc.segments[4].section, "Sub");
        let positions: Vec<usize> = doc.segments.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn bare_hashes_are_ignored() {
        let doc = parse_text("x.md", "#\n###   \ntext");
        assert_eq!(doc.segments.len(), 1);
        assert!(!doc.segments[0].is_heading);
    }
}
