use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docsearch_core::config::ChunkingSettings;
use docsearch_core::loader::DocumentLoader;
use docsearch_core::segmenter::{RecursiveSplitter, Segmenter};
use docsearch_core::types::{Document, INTRODUCTION_SECTION};
use proptest::prelude::*;

#[test]
fn load_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let docs = DocumentLoader::new().load_directory(dir).expect("load");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "a.txt");

    let chunks = Segmenter::new(&ChunkingSettings::default()).unwrap().segment_all(&docs);
    assert_eq!(chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(chunks[0].text, "Short text");
    assert_eq!(chunks[0].id, "a.txt_chunk_0");
    assert_eq!(chunks[0].section_title, INTRODUCTION_SECTION);
}

#[test]
fn load_directory_is_sorted_and_skips_unknown_extensions() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.md"), "# Beta\nbody").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("nested/c.txt"), "charlie").unwrap();
    fs::write(dir.join("image.png"), [0u8, 1, 2]).unwrap();

    let docs = DocumentLoader::new().load_directory(dir).expect("load");
    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.md", "c.txt"]);
    assert!(docs[1].segments[0].is_heading);
}

#[test]
fn load_directory_limited_stops_early() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let docs = DocumentLoader::new().load_directory_limited(dir, 1).expect("load limited");
    assert_eq!(docs.len(), 1, "limited to one source document");
}

#[test]
fn broken_files_are_skipped_by_both_loaders() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.json"), "{ not a document").unwrap();
    fs::write(dir.join("b.txt"), "echo foxtrot").unwrap();
    fs::write(dir.join("c.txt"), "golf hotel").unwrap();

    let loader = DocumentLoader::new();
    let all = loader.load_directory(dir).unwrap();
    let names: Vec<&str> = all.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["b.txt", "c.txt"]);

    let limited = loader.load_directory_limited(dir, 2).unwrap();
    let names: Vec<&str> = limited.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["b.txt"], "the broken file still counts toward the limit");
}

#[test]
fn json_documents_are_loaded_as_is() {
    let tmp = TempDir::new().unwrap();
    let mut doc = Document::new("manual.docx");
    doc.push_heading("Intro", 1).push_paragraph("Hello there.");
    fs::write(tmp.path().join("manual.json"), serde_json::to_string(&doc).unwrap()).unwrap();

    let docs = DocumentLoader::new().load_directory(tmp.path()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "manual.docx");
    assert_eq!(docs[0].segments, doc.segments);
}

#[test]
fn missing_directory_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = DocumentLoader::new().load_directory(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, docsearch_core::Error::NotFound(_)));
}

#[test]
fn document_without_segments_yields_no_chunks() {
    let seg = Segmenter::new(&ChunkingSettings::default()).unwrap();
    assert!(seg.segment(&Document::new("empty.txt")).is_empty());

    let mut headings_only = Document::new("toc.txt");
    headings_only.push_heading("One", 1).push_heading("Two", 1);
    assert!(seg.segment(&headings_only).is_empty());
}

#[test]
fn duplicate_headings_stay_separate_sections() {
    let mut doc = Document::new("faq.md");
    doc.push_heading("Notes", 1)
        .push_paragraph("first")
        .push_heading("Other", 1)
        .push_paragraph("middle")
        .push_heading("Notes", 1)
        .push_paragraph("second");
    let chunks = Segmenter::new(&ChunkingSettings::default()).unwrap().segment(&doc);
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "middle", "second"]);
    assert_eq!(chunks[2].section_title, "Notes");
}

#[test]
fn long_section_respects_budget() {
    let settings = ChunkingSettings { chunk_size: 60, chunk_overlap: 20 };
    let mut doc = Document::new("long.txt");
    doc.push_heading("Body", 1);
    for i in 0..20 {
        doc.push_paragraph(format!("sentence number {i} talks about things"));
    }
    let chunks = Segmenter::new(&settings).unwrap().segment(&doc);
    assert!(chunks.len() > 1);
    for c in &chunks {
        assert!(c.text.chars().count() <= 60, "chunk too long: {:?}", c.text);
        assert_eq!(c.section_chunk_count, chunks.len());
    }
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.id, format!("long.txt_chunk_{i}"));
    }
}

#[test]
fn adjacent_chunks_share_overlap_text() {
    let settings = ChunkingSettings { chunk_size: 30, chunk_overlap: 10 };
    let words: Vec<String> = (0..60).map(|i| format!("w{i:02}")).collect();
    let mut doc = Document::new("words.txt");
    doc.push_paragraph(words.join(" "));

    let chunks = Segmenter::new(&settings).unwrap().segment(&doc);
    assert!(chunks.len() > 2);
    for pair in chunks.windows(2) {
        let prev: Vec<&str> = pair[0].text.split_whitespace().collect();
        let next: Vec<&str> = pair[1].text.split_whitespace().collect();
        let last = prev.last().copied().unwrap();
        assert!(next.contains(&last), "{:?} does not carry over {last:?}", pair[1].text);
        assert_ne!(next[0], prev[0]);
        assert!(prev.contains(&next[0]), "{:?} does not start inside {:?}", pair[1].text, pair[0].text);
    }
}

fn word_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,8}", 0..80).prop_map(|w| w.join(" "))
}

proptest! {
    #[test]
    fn segmentation_is_deterministic(text in word_text()) {
        let mut doc = Document::new("p.txt");
        doc.push_paragraph(text);
        let seg = Segmenter::new(&ChunkingSettings { chunk_size: 40, chunk_overlap: 10 }).unwrap();
        let a = seg.segment(&doc);
        let b = seg.segment(&doc);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn word_chunks_fit_budget_and_are_trimmed(text in word_text(), size in 10usize..60) {
        let overlap = size / 4;
        let splitter = RecursiveSplitter::new(size, overlap).unwrap();
        for chunk in splitter.split_text(&text) {
            prop_assert!(chunk.chars().count() <= size);
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
        }
    }

    #[test]
    fn every_word_survives_splitting(text in word_text()) {
        let splitter = RecursiveSplitter::new(30, 5).unwrap();
        let joined = splitter.split_text(&text).join(" ");
        for word in text.split_whitespace() {
            prop_assert!(joined.contains(word));
        }
    }
}
