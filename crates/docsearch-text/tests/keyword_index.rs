use std::fs;

use docsearch_core::types::{Chunk, RetrievalMethod};
use docsearch_text::{KeywordIndex, KeywordState};
use tempfile::TempDir;

fn chunks() -> Vec<Chunk> {
    [
        "Rust ownership rules prevent data races",
        "The borrow checker enforces ownership at compile time",
        "Gardening tips for growing tomatoes in spring",
        "Water tomatoes early in the morning",
        "Solar panels convert sunlight into electricity",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| Chunk {
        id: format!("notes.txt_chunk_{i}"),
        source: "notes.txt".to_string(),
        file_path: None,
        section_title: "Introduction".to_string(),
        text: text.to_string(),
        chunk_index: i,
        section_chunk_count: 5,
    })
    .collect()
}

#[test]
fn keyword_full_flow() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index/bm25_index.json");
    let index = KeywordIndex::new(&path);
    assert!(index.index(&chunks()));
    assert!(path.exists());

    let results = index.search("tomatoes", 10);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.method == RetrievalMethod::Sparse));
    assert!(results[0].score >= results[1].score);
    assert_eq!(index.stats().total_chunks, 5);

    // A fresh instance rehydrates from disk without re-indexing.
    let reopened = KeywordIndex::new(&path);
    assert!(!reopened.is_loaded());
    let again = reopened.search("tomatoes", 10);
    assert!(reopened.is_loaded());
    let ids: Vec<&str> = again.iter().map(|r| r.id()).collect();
    let expected: Vec<&str> = results.iter().map(|r| r.id()).collect();
    assert_eq!(ids, expected);
}

#[test]
fn persisted_arrays_stay_aligned() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bm25.json");
    KeywordIndex::new(&path).index(&chunks());

    let state: KeywordState = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    state.check_alignment().unwrap();
    for (chunk, tokens) in state.chunks.iter().zip(&state.tokenized_corpus) {
        let expected: Vec<String> = chunk.text.to_lowercase().split_whitespace().map(String::from).collect();
        assert_eq!(tokens, &expected);
    }
}

#[test]
fn never_returns_non_positive_scores() {
    let tmp = TempDir::new().unwrap();
    let index = KeywordIndex::new(tmp.path().join("bm25.json"));
    index.index(&chunks());
    for q in ["ownership", "the", "tomatoes sunlight", "unknownword", ""] {
        assert!(index.search(q, 10).iter().all(|r| r.score > 0.0), "query {q:?}");
    }
    assert!(index.search("unknownword", 10).is_empty());
}

#[test]
fn missing_index_file_searches_empty() {
    let tmp = TempDir::new().unwrap();
    let index = KeywordIndex::new(tmp.path().join("absent.json"));
    assert!(index.search("anything", 5).is_empty());
    assert_eq!(index.stats().total_chunks, 0);
}

#[test]
fn corrupt_or_misaligned_file_is_treated_as_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bm25.json");
    fs::write(&path, b"not json").unwrap();
    assert!(KeywordIndex::new(&path).search("rust", 5).is_empty());

    KeywordIndex::new(&path).index(&chunks());
    let mut state: KeywordState = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    state.chunks.pop();
    fs::write(&path, serde_json::to_vec(&state).unwrap()).unwrap();
    let reopened = KeywordIndex::new(&path);
    assert!(reopened.search("rust", 5).is_empty());
    assert_eq!(reopened.stats().total_chunks, 0);
}

#[test]
fn empty_batch_keeps_previous_state() {
    let tmp = TempDir::new().unwrap();
    let index = KeywordIndex::new(tmp.path().join("bm25.json"));
    index.index(&chunks());
    index.index(&[]);
    assert_eq!(index.stats().total_chunks, 5);
}

#[test]
fn reset_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bm25.json");
    let index = KeywordIndex::new(&path);
    index.index(&chunks());
    index.reset().unwrap();
    assert!(!path.exists());
    assert_eq!(index.stats().total_chunks, 0);
    index.reset().unwrap();
    assert_eq!(index.stats().total_chunks, 0);
    assert!(index.search("rust", 5).is_empty());
}
