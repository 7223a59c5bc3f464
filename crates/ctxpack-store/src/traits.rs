//! Store repository traits for dependency injection and testing

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Chunk, ChunkHit, IndexJob, JobKind, JobStatus, JobWarning, NewChunk, NewResource,
    ResearchJob, ResearchOptions, Resource,
};

/// Repository for resources, their chunks, and their index jobs
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Create a resource after validating its structural invariants
    ///
    /// Fails with `Validation` for inconsistent inputs and `Conflict` when
    /// the (owner, scope, `project_key`, name) tuple is taken or a git
    /// resource in the same scope already points at the same repository
    /// (URLs compared in normalized form).
    async fn create_resource(&self, new: NewResource) -> StoreResult<Resource>;

    /// Fetch a resource by id
    async fn get_resource(&self, id: &Uuid) -> StoreResult<Option<Resource>>;

    /// List resources visible to an owner (None lists unowned resources too)
    async fn list_resources(&self, owner_id: Option<&str>) -> StoreResult<Vec<Resource>>;

    /// Fetch a batch of resources by id, preserving no particular order
    async fn resources_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Resource>>;

    /// Delete a resource; chunks and jobs cascade
    async fn delete_resource(&self, id: &Uuid) -> StoreResult<bool>;

    /// Transition the content (sync side) status, recording or clearing the
    /// error message
    async fn set_content_status(
        &self,
        id: &Uuid,
        status: crate::models::ContentStatus,
        error: Option<&str>,
    ) -> StoreResult<()>;

    /// Transition the vector (index side) status, recording or clearing the
    /// error message
    async fn set_vector_status(
        &self,
        id: &Uuid,
        status: crate::models::VectorStatus,
        error: Option<&str>,
    ) -> StoreResult<()>;

    /// Record the outcome of a sync: commits, update flag, `last_synced_at`
    async fn record_sync(
        &self,
        id: &Uuid,
        local_commit: Option<&str>,
        remote_commit: Option<&str>,
        update_available: Option<bool>,
    ) -> StoreResult<()>;

    /// Record an update check that resolved both heads
    async fn record_update_check(
        &self,
        id: &Uuid,
        local_commit: Option<&str>,
        remote_commit: Option<&str>,
        update_available: Option<bool>,
    ) -> StoreResult<()>;

    /// Record an update check that could not resolve anything (missing
    /// materialized path); only bumps `last_update_check_at`
    async fn touch_update_check(&self, id: &Uuid) -> StoreResult<()>;

    /// Record a successful index: chunk count and `last_indexed_at`
    async fn finish_index(&self, id: &Uuid, chunk_count: i64) -> StoreResult<()>;

    /// Atomically replace the chunk set of a resource
    ///
    /// A single transactional delete-then-insert: readers observe either the
    /// old set or the new set, never a mixture. Returns the inserted count.
    async fn replace_chunks(&self, resource_id: &Uuid, chunks: Vec<NewChunk>) -> StoreResult<u64>;

    /// Chunks of a single file, ordered by line range (tool surface reads)
    async fn chunks_for_file(&self, resource_id: &Uuid, filepath: &str)
    -> StoreResult<Vec<Chunk>>;

    /// Nearest-neighbour search under cosine distance over non-null
    /// embeddings, restricted to the given resources
    async fn vector_search(
        &self,
        resource_ids: &[Uuid],
        embedding: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<ChunkHit>>;

    /// Enqueue a job for a resource
    async fn create_job(&self, resource_id: &Uuid, kind: JobKind) -> StoreResult<IndexJob>;

    /// Oldest queued job for a resource by (`created_at`, id)
    async fn next_queued_job(&self, resource_id: &Uuid) -> StoreResult<Option<IndexJob>>;

    /// Transition a queued job to running, resetting its counters
    ///
    /// Terminal rows are never reopened; returns `NotFound` when no queued
    /// row with this id exists.
    async fn mark_job_running(&self, job_id: &Uuid) -> StoreResult<IndexJob>;

    /// Record the discovered file total
    async fn set_job_totals(&self, job_id: &Uuid, total_files: i32) -> StoreResult<()>;

    /// Advance progress and processed-file counters
    ///
    /// Progress is clamped monotonic: a smaller value than the stored one is
    /// ignored.
    async fn update_job_progress(
        &self,
        job_id: &Uuid,
        progress: i32,
        processed_files: i32,
    ) -> StoreResult<()>;

    /// Append a warning to the job row, preserving insertion order
    async fn append_job_warning(&self, job_id: &Uuid, warning: &JobWarning) -> StoreResult<()>;

    /// Terminate a running job
    ///
    /// Sets progress=100 and `completed_at`; never overwrites an already
    /// terminal row.
    async fn complete_job(
        &self,
        job_id: &Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<()>;

    /// Fetch a job by id
    async fn get_job(&self, job_id: &Uuid) -> StoreResult<Option<IndexJob>>;

    /// All jobs of a resource, newest first
    async fn list_jobs(&self, resource_id: &Uuid) -> StoreResult<Vec<IndexJob>>;
}

/// Repository for asynchronous research jobs
#[async_trait]
pub trait ResearchJobRepository: Send + Sync {
    /// Create a research job in the queued state
    async fn create_research_job(
        &self,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
        options: &ResearchOptions,
    ) -> StoreResult<ResearchJob>;

    /// Fetch a research job by id
    async fn get_research_job(&self, id: &Uuid) -> StoreResult<Option<ResearchJob>>;

    /// Transition a queued research job to running
    async fn mark_research_running(&self, id: &Uuid) -> StoreResult<()>;

    /// Persist the final result and mark completed
    async fn complete_research_job(
        &self,
        id: &Uuid,
        result: serde_json::Value,
    ) -> StoreResult<()>;

    /// Persist the failure and mark failed; never retried by the core
    async fn fail_research_job(&self, id: &Uuid, error: &str) -> StoreResult<()>;
}
