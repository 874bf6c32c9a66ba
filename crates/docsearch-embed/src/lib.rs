//! docsearch-embed
//!
//! Embedding capability implementations. The hashed embedder is always
//! available; the BGE-M3 model needs the `candle` feature and local weights.

use std::sync::Arc;

use tracing::info;

use docsearch_core::config::{EmbeddingProvider, EmbeddingSettings};
use docsearch_core::error::Result;
use docsearch_core::traits::Embedder;

pub mod hash;
pub use hash::HashEmbedder;

#[cfg(feature = "candle")]
pub mod device;
#[cfg(feature = "candle")]
pub mod model;
#[cfg(feature = "candle")]
pub mod pool;
#[cfg(feature = "candle")]
pub mod tokenize;

#[cfg(feature = "candle")]
pub use model::BgeM3Embedder;
#[cfg(feature = "candle")]
pub use pool::masked_mean_l2;

/// Build the embedder selected by `settings.provider`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Hash => {
            info!(dim = settings.dimension, "using hashed embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dimension)?))
        }
        #[cfg(feature = "candle")]
        EmbeddingProvider::BgeM3 => {
            if settings.dimension != model::BGE_M3_DIM {
                tracing::warn!(configured = settings.dimension, actual = model::BGE_M3_DIM, "embedding.dimension ignored for bge-m3");
            }
            Ok(Arc::new(BgeM3Embedder::load(settings.model_dir.as_deref())?))
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingProvider::BgeM3 => Err(docsearch_core::error::Error::InvalidConfig(
            "embedding.provider = \"bge-m3\" requires docsearch-embed to be built with the `candle` feature".into(),
        )),
    }
}
