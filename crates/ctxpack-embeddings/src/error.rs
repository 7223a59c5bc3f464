//! Embedding error types

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = std::result::Result<T, EmbeddingError>;

/// Errors surfaced by embedding providers
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider rejected the request or returned a failure status
    #[error("embedding provider failed ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure; retriable
    #[error("embedding transport error: {message}")]
    Transient { message: String },

    /// The provider returned vectors of an unexpected dimensionality
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// The response body could not be decoded
    #[error("malformed provider response: {message}")]
    Decode { message: String },
}
