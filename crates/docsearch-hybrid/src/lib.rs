//! docsearch-hybrid
//!
//! Weighted Reciprocal Rank Fusion over the dense and keyword indexes, and
//! the [`HybridRetriever`] facade that coordinates indexing, search, reset
//! and stats across both.

pub mod fusion;
pub mod marker;
pub mod retriever;

pub use fusion::{reciprocal_rank_fusion, FusionRanker, FusionWeights, RRF_K};
pub use marker::{IndexingMarker, MarkerFile};
pub use retriever::{HybridRetriever, IndexReport, RetrieverStats, SearchParams};
