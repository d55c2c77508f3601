//! Embedding provider trait and deterministic fallback implementation

use crate::error::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Abstract interface for generating vector embeddings from text.
///
/// Implementations must be `Send + Sync` so a single provider can be shared
/// across sessions via `Arc<dyn EmbeddingProvider>`. Vectors are expected to
/// be L2-normalized; similarity comparisons use [`cosine_similarity`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text input.
    ///
    /// The returned vector has length [`dimensions()`](Self::dimensions) and
    /// is deterministic per text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// The dimensionality of the vectors produced by this provider
    fn dimensions(&self) -> usize;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs rather than
/// propagating an error; a non-comparable pair is simply not a match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Deterministic hash-based embedding provider.
///
/// Spreads a text hash across the configured dimensions and L2-normalizes
/// the result: identical texts produce identical embeddings, different
/// texts diverge with very high probability, and no network is involved.
#[derive(Clone, Debug)]
pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    /// Create a provider with the given dimensionality (768 matches the
    /// production gateway default).
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_embedding(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut hash = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            let value = (hash as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);

            // Chain hash for the next dimension
            let mut h = DefaultHasher::new();
            hash.hash(&mut h);
            hash = h.finish();
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hash_to_embedding(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_embeddings() {
        let provider = HashEmbedding::new(768);
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_different_texts_diverge() {
        let provider = HashEmbedding::new(768);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("goodbye").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_dimensions_and_normalization() {
        let provider = HashEmbedding::new(384);
        let emb = provider.embed("normalize me").await.unwrap();
        assert_eq!(emb.len(), 384);
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = HashEmbedding::new(64);
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        for (i, text) in texts.iter().enumerate() {
            assert_eq!(batch[i], provider.embed(text).await.unwrap());
        }
    }

    #[test]
    fn test_cosine_similarity_self_is_one() {
        let v = vec![0.6f32, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let a = vec![1.0f32, 0.0];
        let b = vec![1.0f32];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
