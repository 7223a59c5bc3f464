//! Indexer error types

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for indexing operations
pub type IndexerResult<T> = std::result::Result<T, IndexerError>;

/// Fatal indexing errors
///
/// Per-file problems never take this shape; they become warnings on the job
/// row. These variants fail the job (and the corresponding status axis on
/// the resource).
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The resource disappeared between scheduling and execution
    #[error("resource not found: {0}")]
    ResourceNotFound(Uuid),

    /// A git resource whose clone is not on disk when indexing starts
    #[error("materialized path missing for resource {0}")]
    MaterializedPathMissing(Uuid),

    /// Store read/write failure
    #[error(transparent)]
    Store(#[from] ctxpack_store::StoreError),

    /// Materializer failure (clone, fetch, missing local path)
    #[error(transparent)]
    Git(#[from] ctxpack_git::GitError),

    /// Embedder construction failure (bad overrides)
    #[error(transparent)]
    Embedding(#[from] ctxpack_embeddings::EmbeddingError),

    /// Anything else fatal
    #[error("{0}")]
    Other(String),
}
