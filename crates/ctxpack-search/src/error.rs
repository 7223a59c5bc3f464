//! Search error types

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Which subtrack an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtrack {
    Text,
    Vector,
}

impl std::fmt::Display for Subtrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Vector => write!(f, "vector"),
        }
    }
}

/// Errors surfaced by hybrid search
///
/// Subtrack failures are tolerated silently when the other subtrack can
/// still answer; they only propagate when the requested mode forces the
/// failing subtrack.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Input rejected before any subtrack ran
    #[error("invalid search request: {message}")]
    Validation { message: String },

    /// A subtrack exceeded its independent deadline
    #[error("{subtrack} subtrack timed out after {timeout_ms}ms")]
    Timeout { subtrack: Subtrack, timeout_ms: u64 },

    /// A subtrack failed outright
    #[error("{subtrack} subtrack failed: {message}")]
    SubtrackFailed { subtrack: Subtrack, message: String },

    /// Query embedding failed
    #[error(transparent)]
    Embedding(#[from] ctxpack_embeddings::EmbeddingError),

    /// Store lookup failed
    #[error(transparent)]
    Store(#[from] ctxpack_store::StoreError),
}
