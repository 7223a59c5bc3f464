//! Centralized error type for embedders of the ctxpack core
//!
//! Collects the sub-crate errors behind one enum so outer layers (HTTP,
//! CLI) map a single type onto their response shapes. Implements the shared
//! `CommonError` constructors from ctxpack-common.

use ctxpack_common::CommonError;
use thiserror::Error;

/// The main error type for assembled ctxpack operations
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or process IO failure
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store layer failure
    #[error(transparent)]
    Store(#[from] ctxpack_store::StoreError),

    /// Materializer failure
    #[error(transparent)]
    Git(#[from] ctxpack_git::GitError),

    /// Embedding provider failure
    #[error(transparent)]
    Embedding(#[from] ctxpack_embeddings::EmbeddingError),

    /// Indexing pipeline failure
    #[error(transparent)]
    Indexer(#[from] ctxpack_indexing::IndexerError),

    /// Search failure
    #[error(transparent)]
    Search(#[from] ctxpack_search::SearchError),

    /// Agent driver failure
    #[error(transparent)]
    Agent(#[from] ctxpack_agent::AgentError),

    /// Tool surface failure
    #[error(transparent)]
    Tool(#[from] ctxpack_tools::ToolError),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl CommonError for Error {
    fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    fn config_error(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    fn validation_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn other_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<ctxpack_config::ConfigError> for Error {
    fn from(e: ctxpack_config::ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

/// Result alias for assembled operations
pub type Result<T> = std::result::Result<T, Error>;
