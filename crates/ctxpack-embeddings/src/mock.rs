//! Deterministic mock embedder for tests

use async_trait::async_trait;

use crate::error::EmbeddingResult;
use crate::traits::Embedder;

/// Mock embedder producing deterministic pseudo-vectors from text bytes
///
/// No external calls, stable across runs, cheap to construct with a small
/// dimension for tests.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Create a mock with the given dimensionality
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Deterministic vector for a text: a rotating byte-sum fingerprint,
    /// L2-normalized so cosine distances behave
    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimension;
            #[allow(clippy::indexing_slicing)] // slot < dimension by construction
            {
                vector[slot] += f32::from(byte) / 255.0;
            }
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_many(&self, texts: &[String]) -> EmbeddingResult<Vec<Option<Vec<f32>>>> {
        Ok(texts.iter().map(|t| Some(self.vector_for(t))).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed_one("beta").await.expect("embed");
        let b = embedder.embed_one("beta").await.expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn test_distinct_texts_differ() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed_one("alpha").await.expect("embed");
        let b = embedder.embed_one("gamma").await.expect("embed");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_batch_has_no_gaps() {
        let embedder = MockEmbedder::new(4);
        let vectors = embedder
            .embed_many(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .expect("embed");
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(Option::is_some));
    }
}
