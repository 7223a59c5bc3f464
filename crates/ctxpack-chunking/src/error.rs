//! Chunking error types

use thiserror::Error;

/// Result type alias for chunking operations
pub type ChunkingResult<T> = std::result::Result<T, ChunkingError>;

/// Errors produced while splitting a file into chunks
///
/// The indexer converts these into chunk-stage warnings; they never fail a
/// job on their own.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The grammar rejected the source badly enough that no tree came back
    #[error("parse failed for {filepath}: {message}")]
    ParseFailed { filepath: String, message: String },

    /// A grammar could not be loaded into the parser
    #[error("language setup failed for {language}: {message}")]
    LanguageSetup { language: String, message: String },
}
