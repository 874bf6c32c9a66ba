use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;

/// Hashed bag-of-words embedder: every lower-cased token adds a signed unit
/// to one bucket, and the vector is L2-normalized. Deterministic and offline;
/// texts sharing words get positive cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        Ok(Self { dim, id: format!("hash-{dim}") })
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn vectors_are_unit_length() {
        let e = HashEmbedder::new(64).unwrap();
        let v = e.embed_sync("hello world again");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() <= 1e-5, "norm={norm}");
    }

    #[test]
    fn case_does_not_matter() {
        let e = HashEmbedder::new(128).unwrap();
        assert_eq!(e.embed_sync("Rust Borrow"), e.embed_sync("rust borrow"));
    }

    #[test]
    fn shared_words_raise_similarity() {
        let e = HashEmbedder::new(384).unwrap();
        let q = e.embed_sync("growing tomatoes");
        let near = e.embed_sync("tips for growing tomatoes in spring");
        let far = e.embed_sync("solar panels convert sunlight");
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[test]
    fn blank_text_is_zero_vector() {
        let e = HashEmbedder::new(8).unwrap();
        assert!(e.embed_sync("   ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(HashEmbedder::new(0).is_err());
    }
}
