//! Trait abstraction for embedding providers
//!
//! The core treats embedding as an external capability: one batch interface,
//! provider-agnostic.

use async_trait::async_trait;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Capability interface for dense-vector embedding
///
/// `embed_many` returns one entry per input text, in order. A `None` entry
/// signals a per-item failure: the caller persists the chunk without a
/// vector and records an embed-stage warning instead of aborting.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed_many(&self, texts: &[String]) -> EmbeddingResult<Vec<Option<Vec<f32>>>>;

    /// Embed a single text (query embedding)
    async fn embed_one(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self.embed_many(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .flatten()
            .ok_or_else(|| EmbeddingError::Decode {
                message: "provider returned no embedding for the query".to_string(),
            })
    }

    /// Dimensionality of the vectors this provider produces
    fn dimension(&self) -> usize;

    /// Model identifier, for logging and stream events
    fn model_name(&self) -> &str;
}
