//! Tool surface error types

use std::time::Duration;
use thiserror::Error;

/// Result type alias for tool operations
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Errors surfaced by the resource-scoped tools
#[derive(Debug, Error)]
pub enum ToolError {
    /// File or resource root missing
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Input rejected (bad range, path escaping the root, empty pattern)
    #[error("invalid tool input: {message}")]
    Validation { message: String },

    /// The grep subprocess exited with an error status
    #[error("grep subprocess failed ({command}): {stderr}")]
    Subprocess {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The grep subprocess exceeded its deadline
    #[error("grep subprocess timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Filesystem error while reading a file or walking a tree
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
