use async_trait::async_trait;

use crate::error::Result;

/// The embedding capability consumed by the vector index.
///
/// `embed_batch` must preserve order and return exactly one vector per input;
/// a failure fails the whole batch.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| crate::error::Error::Embedding("embedder returned no vector".to_string()))
    }
}
