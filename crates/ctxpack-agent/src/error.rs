//! Agent error types

use thiserror::Error;

/// Result type alias for agent operations
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Errors surfaced by the agent driver
#[derive(Debug, Error)]
pub enum AgentError {
    /// The chat model failed or rejected the request
    #[error("chat model failed: {message}")]
    Upstream { message: String },

    /// A tool handler failed in a way the model cannot recover from
    #[error("tool '{name}' failed: {message}")]
    ToolFailed { name: String, message: String },

    /// The consumer went away mid-run
    #[error("stream cancelled by consumer")]
    Cancelled,

    /// Input rejected (unknown resource, missing resource id)
    #[error("invalid agent request: {message}")]
    Validation { message: String },

    /// Store lookup failed
    #[error(transparent)]
    Store(#[from] ctxpack_store::StoreError),

    /// Retrieval failed
    #[error(transparent)]
    Search(#[from] ctxpack_search::SearchError),
}
