//! docsearch-text
//!
//! Keyword side of the hybrid retriever: whitespace tokenizer, BM25 Okapi
//! ranking and a JSON-persisted index whose chunk, token and ranking arrays
//! stay index-aligned.

pub mod bm25;
pub mod index;
pub mod tokenize;

pub use bm25::Bm25Okapi;
pub use index::{KeywordIndex, KeywordState, KeywordStats};
