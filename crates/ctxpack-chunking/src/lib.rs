//! AST-aware chunking for ctxpack
//!
//! Pure and deterministic: given the same inputs and settings, the chunker
//! produces the same bounded, line-ranged, contextualized chunks.

pub mod chunker;
pub mod error;
pub mod languages;

pub use chunker::{
    Chunker, ChunkDraft, DEFAULT_MAX_CHUNK_SIZE, FileChunkOutcome, FileInput,
};
pub use error::{ChunkingError, ChunkingResult};
pub use languages::{
    LANGUAGE_REGISTRY, LanguageConfig, language_config, language_for_extension, language_for_path,
};
