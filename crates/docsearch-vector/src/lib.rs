//! docsearch-vector
//!
//! Dense side of the hybrid retriever. [`VectorIndex`] embeds chunks through
//! an [`Embedder`](docsearch_core::traits::Embedder) and stores them in a
//! [`VectorStore`]: LanceDB ([`LanceVectorStore`]) by default, or the
//! brute-force [`FlatVectorStore`] for small corpora and tests.

pub mod flat;
pub mod index;
pub mod lance;
pub mod schema;
pub mod store;

pub use flat::FlatVectorStore;
pub use index::{VectorIndex, VectorStats, DEFAULT_BATCH_SIZE};
pub use lance::LanceVectorStore;
pub use store::{cosine_distance, VectorMatch, VectorRecord, VectorStore};
