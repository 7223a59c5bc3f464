//! Persisted metadata and chunk storage for ctxpack
//!
//! Resources, their chunks (with pgvector embeddings), index jobs, and
//! research jobs live here, behind repository traits with a Postgres
//! implementation and an in-memory mock for tests.

pub mod error;
pub mod git_url;
pub mod identity;
pub mod mock;
pub mod models;
pub mod pool;
pub mod repository;
pub mod traits;

pub use error::{StoreError, StoreErrorExt, StoreOperation, StoreResult};
pub use git_url::normalize_git_url;
pub use identity::{chunk_hash, chunk_id};
pub use mock::MockStore;
pub use models::{
    Chunk, ChunkHit, ContentStatus, IndexJob, JobKind, JobStatus, JobWarning, LegacyStatus,
    NewChunk, NewResource, ResearchJob, ResearchOptions, Resource, ResourceKind, ResourceScope,
    SearchMode, VectorStatus, WarningStage,
};
pub use pool::{create_pool, initialize_database};
pub use repository::PgStore;
pub use traits::{ResearchJobRepository, ResourceRepository};
