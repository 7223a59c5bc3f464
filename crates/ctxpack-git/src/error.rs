//! Error types for git subprocess operations

use std::time::Duration;
use thiserror::Error;

/// Result type alias for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Errors surfaced by the materializer and the git runner
#[derive(Debug, Error)]
pub enum GitError {
    /// The subprocess exited non-zero
    #[error("git command failed ({command}): {stderr}")]
    CommandFailed {
        /// The full command line that was run
        command: String,
        /// Exit code when the process exited normally
        status: Option<i32>,
        /// Captured stderr, trimmed
        stderr: String,
    },

    /// The subprocess exceeded its deadline
    #[error("git command timed out after {timeout:?} ({command})")]
    Timeout { command: String, timeout: Duration },

    /// Spawning or filesystem work around the subprocess failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A git resource without a remote URL cannot be materialized
    #[error("resource has no remote url")]
    MissingUrl,

    /// A local resource whose configured path does not exist
    #[error("local path does not exist: {path}")]
    PathMissing { path: String },
}
