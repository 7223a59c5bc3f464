//! In-memory implementation of the store traits for testing

// Allow test-specific patterns in mock implementation
#![allow(clippy::unwrap_used)] // Mocks can panic on lock poisoning
#![allow(clippy::expect_used)] // Test code can use expect
#![allow(clippy::arithmetic_side_effects)] // Test counters can overflow
#![allow(clippy::significant_drop_tightening)] // Mock locks don't need optimization
#![allow(clippy::cast_precision_loss)] // Cosine math on test vectors

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::git_url::normalize_git_url;
use crate::identity::{chunk_hash, chunk_id};
use crate::models::{
    Chunk, ChunkHit, ContentStatus, IndexJob, JobKind, JobStatus, JobWarning, NewChunk,
    NewResource, ResearchJob, ResearchOptions, Resource, ResourceKind, VectorStatus,
};
use crate::traits::{ResearchJobRepository, ResourceRepository};

// Type aliases to simplify complex types
type ResourceMap = Arc<Mutex<HashMap<Uuid, Resource>>>;
type ChunkList = Arc<Mutex<Vec<Chunk>>>;
type JobList = Arc<Mutex<Vec<IndexJob>>>;
type ResearchMap = Arc<Mutex<HashMap<Uuid, ResearchJob>>>;

/// Mock store for testing
///
/// Jobs keep strict insertion order, so FIFO selection matches the Postgres
/// `(created_at, id)` ordering even when timestamps collide.
#[derive(Clone, Default)]
pub struct MockStore {
    pub resources: ResourceMap,
    pub chunks: ChunkList,
    pub jobs: JobList,
    pub research_jobs: ResearchMap,

    // Behavior controls for testing
    pub should_fail_next: Arc<Mutex<bool>>,
    pub error_message: Arc<Mutex<String>>,
}

impl MockStore {
    /// Create a new mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure to fail on next operation
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned
    pub fn fail_next(&self, message: &str) {
        *self.should_fail_next.lock().unwrap() = true;
        *self.error_message.lock().unwrap() = message.to_string();
    }

    /// Check if should fail and reset
    fn check_fail(&self) -> StoreResult<()> {
        let mut should_fail = self.should_fail_next.lock().unwrap();
        if *should_fail {
            *should_fail = false;
            let message = self.error_message.lock().unwrap().clone();
            return Err(StoreError::Validation { message });
        }
        Ok(())
    }

    /// Number of chunks currently held for a resource (test assertions)
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned
    pub fn chunk_count(&self, resource_id: &Uuid) -> usize {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.resource_id == *resource_id)
            .count()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl ResourceRepository for MockStore {
    async fn create_resource(&self, new: NewResource) -> StoreResult<Resource> {
        self.check_fail()?;
        new.validate().map_err(StoreError::validation)?;

        let mut resources = self.resources.lock().unwrap();
        let duplicate = resources.values().any(|r| {
            r.owner_id == new.owner_id
                && r.scope == new.scope
                && r.project_key == new.project_key
                && r.name == new.name
        });
        if duplicate {
            return Err(StoreError::Conflict {
                message: format!("resource '{}' already exists in this scope", new.name),
            });
        }

        // Same repository under a different URL spelling is also a duplicate
        if new.kind == ResourceKind::Git
            && let Some(url) = new.url.as_deref()
        {
            let normalized = normalize_git_url(url);
            let duplicate_repo = resources.values().any(|r| {
                r.kind == ResourceKind::Git
                    && r.owner_id == new.owner_id
                    && r.scope == new.scope
                    && r.project_key == new.project_key
                    && r.url.as_deref().is_some_and(|u| normalize_git_url(u) == normalized)
            });
            if duplicate_repo {
                return Err(StoreError::Conflict {
                    message: format!("a resource for {normalized} already exists in this scope"),
                });
            }
        }

        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            scope: new.scope,
            project_key: new.project_key,
            kind: new.kind,
            url: new.url,
            path: new.path,
            branch: new.branch,
            commit: new.commit,
            scoped_paths: new.scoped_paths,
            notes: new.notes,
            content_status: ContentStatus::Missing,
            vector_status: VectorStatus::Missing,
            content_error: None,
            vector_error: None,
            chunk_count: 0,
            last_synced_at: None,
            last_indexed_at: None,
            last_local_commit: None,
            last_remote_commit: None,
            update_available: false,
            last_update_check_at: None,
            created_at: now,
            updated_at: now,
        };
        resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn get_resource(&self, id: &Uuid) -> StoreResult<Option<Resource>> {
        self.check_fail()?;
        Ok(self.resources.lock().unwrap().get(id).cloned())
    }

    async fn list_resources(&self, owner_id: Option<&str>) -> StoreResult<Vec<Resource>> {
        self.check_fail()?;
        let mut list: Vec<Resource> = self
            .resources
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.owner_id.is_none() || owner_id.is_some_and(|o| r.owner_id.as_deref() == Some(o))
            })
            .cloned()
            .collect();
        list.sort_by_key(|r| r.created_at);
        Ok(list)
    }

    async fn resources_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Resource>> {
        self.check_fail()?;
        let resources = self.resources.lock().unwrap();
        let mut list: Vec<Resource> = ids
            .iter()
            .filter_map(|id| resources.get(id).cloned())
            .collect();
        list.sort_by_key(|r| r.created_at);
        Ok(list)
    }

    async fn delete_resource(&self, id: &Uuid) -> StoreResult<bool> {
        self.check_fail()?;
        let removed = self.resources.lock().unwrap().remove(id).is_some();
        if removed {
            // Cascade, as the schema does
            self.chunks.lock().unwrap().retain(|c| c.resource_id != *id);
            self.jobs.lock().unwrap().retain(|j| j.resource_id != *id);
        }
        Ok(removed)
    }

    async fn set_content_status(
        &self,
        id: &Uuid,
        status: ContentStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| StoreError::resource_not_found(*id))?;
        resource.content_status = status;
        resource.content_error = error.map(ToString::to_string);
        resource.updated_at = Utc::now();
        Ok(())
    }

    async fn set_vector_status(
        &self,
        id: &Uuid,
        status: VectorStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| StoreError::resource_not_found(*id))?;
        resource.vector_status = status;
        resource.vector_error = error.map(ToString::to_string);
        resource.updated_at = Utc::now();
        Ok(())
    }

    async fn record_sync(
        &self,
        id: &Uuid,
        local_commit: Option<&str>,
        remote_commit: Option<&str>,
        update_available: Option<bool>,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| StoreError::resource_not_found(*id))?;
        resource.last_local_commit = local_commit.map(ToString::to_string);
        resource.last_remote_commit = remote_commit.map(ToString::to_string);
        if let Some(flag) = update_available {
            resource.update_available = flag;
        }
        resource.last_synced_at = Some(Utc::now());
        resource.updated_at = Utc::now();
        Ok(())
    }

    async fn record_update_check(
        &self,
        id: &Uuid,
        local_commit: Option<&str>,
        remote_commit: Option<&str>,
        update_available: Option<bool>,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| StoreError::resource_not_found(*id))?;
        resource.last_local_commit = local_commit.map(ToString::to_string);
        resource.last_remote_commit = remote_commit.map(ToString::to_string);
        if let Some(flag) = update_available {
            resource.update_available = flag;
        }
        resource.last_update_check_at = Some(Utc::now());
        resource.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_update_check(&self, id: &Uuid) -> StoreResult<()> {
        self.check_fail()?;
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| StoreError::resource_not_found(*id))?;
        resource.last_update_check_at = Some(Utc::now());
        Ok(())
    }

    async fn finish_index(&self, id: &Uuid, chunk_count: i64) -> StoreResult<()> {
        self.check_fail()?;
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| StoreError::resource_not_found(*id))?;
        resource.chunk_count = chunk_count;
        resource.last_indexed_at = Some(Utc::now());
        resource.updated_at = Utc::now();
        Ok(())
    }

    async fn replace_chunks(&self, resource_id: &Uuid, chunks: Vec<NewChunk>) -> StoreResult<u64> {
        self.check_fail()?;
        let mut stored = self.chunks.lock().unwrap();
        stored.retain(|c| c.resource_id != *resource_id);

        let now = Utc::now();
        let mut inserted = 0u64;
        for chunk in chunks {
            let hash = chunk_hash(
                &chunk.filepath,
                chunk.line_start,
                chunk.line_end,
                &chunk.contextualized_text,
            );
            let id = chunk_id(
                resource_id,
                &chunk.filepath,
                chunk.line_start,
                chunk.line_end,
                &hash,
            );
            stored.push(Chunk {
                id,
                resource_id: *resource_id,
                filepath: chunk.filepath,
                line_start: chunk.line_start,
                line_end: chunk.line_end,
                text: chunk.text,
                contextualized_text: chunk.contextualized_text,
                scope: chunk.scope,
                entities: chunk.entities,
                language: chunk.language,
                hash,
                embedding: chunk.embedding,
                created_at: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn chunks_for_file(
        &self,
        resource_id: &Uuid,
        filepath: &str,
    ) -> StoreResult<Vec<Chunk>> {
        self.check_fail()?;
        let mut list: Vec<Chunk> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.resource_id == *resource_id && c.filepath == filepath)
            .cloned()
            .collect();
        list.sort_by_key(|c| (c.line_start, c.line_end));
        Ok(list)
    }

    async fn vector_search(
        &self,
        resource_ids: &[Uuid],
        embedding: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<ChunkHit>> {
        self.check_fail()?;
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.chunks.lock().unwrap();
        let mut hits: Vec<ChunkHit> = chunks
            .iter()
            .filter(|c| resource_ids.contains(&c.resource_id))
            .filter_map(|c| {
                c.embedding.as_ref().map(|e| ChunkHit {
                    chunk: c.clone(),
                    distance: cosine_distance(e, embedding),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn create_job(&self, resource_id: &Uuid, kind: JobKind) -> StoreResult<IndexJob> {
        self.check_fail()?;
        let job = IndexJob {
            id: Uuid::new_v4(),
            resource_id: *resource_id,
            kind,
            status: JobStatus::Queued,
            progress: 0,
            error: None,
            warnings: Vec::new(),
            total_files: 0,
            processed_files: 0,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        // Insertion order is the queue order
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn next_queued_job(&self, resource_id: &Uuid) -> StoreResult<Option<IndexJob>> {
        self.check_fail()?;
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.resource_id == *resource_id && j.status == JobStatus::Queued)
            .cloned())
    }

    async fn mark_job_running(&self, job_id: &Uuid) -> StoreResult<IndexJob> {
        self.check_fail()?;
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == *job_id && j.status == JobStatus::Queued)
            .ok_or_else(|| StoreError::job_not_found(*job_id))?;
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        job.progress = 0;
        job.processed_files = 0;
        job.error = None;
        Ok(job.clone())
    }

    async fn set_job_totals(&self, job_id: &Uuid, total_files: i32) -> StoreResult<()> {
        self.check_fail()?;
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == *job_id && j.status == JobStatus::Running)
        {
            job.total_files = total_files;
        }
        Ok(())
    }

    async fn update_job_progress(
        &self,
        job_id: &Uuid,
        progress: i32,
        processed_files: i32,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == *job_id && j.status == JobStatus::Running)
        {
            // Monotonic, matching the Postgres GREATEST guard
            job.progress = job.progress.max(progress.clamp(0, 100));
            job.processed_files = processed_files;
        }
        Ok(())
    }

    async fn append_job_warning(&self, job_id: &Uuid, warning: &JobWarning) -> StoreResult<()> {
        self.check_fail()?;
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == *job_id)
            .ok_or_else(|| StoreError::job_not_found(*job_id))?;
        job.warnings.push(warning.clone());
        Ok(())
    }

    async fn complete_job(
        &self,
        job_id: &Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        self.check_fail()?;
        if !status.is_terminal() {
            return Err(StoreError::validation(format!(
                "complete_job requires a terminal status, got {status}"
            )));
        }
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == *job_id && !j.status.is_terminal())
        {
            job.status = status;
            job.error = error.map(ToString::to_string);
            job.progress = 100;
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &Uuid) -> StoreResult<Option<IndexJob>> {
        self.check_fail()?;
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == *job_id)
            .cloned())
    }

    async fn list_jobs(&self, resource_id: &Uuid) -> StoreResult<Vec<IndexJob>> {
        self.check_fail()?;
        let mut list: Vec<IndexJob> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.resource_id == *resource_id)
            .cloned()
            .collect();
        list.reverse();
        Ok(list)
    }
}

#[async_trait]
impl ResearchJobRepository for MockStore {
    async fn create_research_job(
        &self,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
        options: &ResearchOptions,
    ) -> StoreResult<ResearchJob> {
        self.check_fail()?;
        let job = ResearchJob {
            id: Uuid::new_v4(),
            owner_id: owner_id.map(ToString::to_string),
            query: query.to_string(),
            resource_ids: resource_ids.to_vec(),
            options: options.clone(),
            status: JobStatus::Queued,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.research_jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_research_job(&self, id: &Uuid) -> StoreResult<Option<ResearchJob>> {
        self.check_fail()?;
        Ok(self.research_jobs.lock().unwrap().get(id).cloned())
    }

    async fn mark_research_running(&self, id: &Uuid) -> StoreResult<()> {
        self.check_fail()?;
        let mut jobs = self.research_jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(id)
            && job.status == JobStatus::Queued
        {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn complete_research_job(
        &self,
        id: &Uuid,
        result: serde_json::Value,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let mut jobs = self.research_jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(id)
            && !job.status.is_terminal()
        {
            job.status = JobStatus::Completed;
            job.result = Some(result);
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail_research_job(&self, id: &Uuid, error: &str) -> StoreResult<()> {
        self.check_fail()?;
        let mut jobs = self.research_jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(id)
            && !job.status.is_terminal()
        {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceKind, ResourceScope};

    fn local_resource(name: &str) -> NewResource {
        NewResource {
            owner_id: None,
            name: name.to_string(),
            scope: ResourceScope::Project,
            project_key: "/p".to_string(),
            kind: ResourceKind::Local,
            url: None,
            path: Some("/tmp/demo".to_string()),
            branch: None,
            commit: None,
            scoped_paths: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_resource_rejects_duplicates() {
        let store = MockStore::new();
        store
            .create_resource(local_resource("demo"))
            .await
            .expect("first create succeeds");

        let err = store
            .create_resource(local_resource("demo"))
            .await
            .expect_err("duplicate tuple must conflict");
        assert!(matches!(err, StoreError::Conflict { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_create_resource_rejects_same_repo_under_different_url() {
        let store = MockStore::new();
        let git = |name: &str, url: &str| NewResource {
            owner_id: None,
            name: name.to_string(),
            scope: ResourceScope::Global,
            project_key: String::new(),
            kind: ResourceKind::Git,
            url: Some(url.to_string()),
            path: None,
            branch: None,
            commit: None,
            scoped_paths: None,
            notes: None,
        };

        store
            .create_resource(git("one", "https://github.com/user/repo.git"))
            .await
            .expect("first create succeeds");

        let err = store
            .create_resource(git("two", "git@github.com:user/repo"))
            .await
            .expect_err("same repo, different spelling, must conflict");
        assert!(matches!(err, StoreError::Conflict { .. }), "got {err:?}");

        store
            .create_resource(git("three", "https://github.com/user/other"))
            .await
            .expect("a different repo is fine");
    }

    #[tokio::test]
    async fn test_create_resource_validates_kind_pairing() {
        let store = MockStore::new();
        let mut bad = local_resource("demo");
        bad.kind = ResourceKind::Git; // git without url
        let err = store.create_resource(bad).await.expect_err("must reject");
        assert!(matches!(err, StoreError::Validation { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_replace_chunks_is_delete_then_insert() {
        let store = MockStore::new();
        let resource = store
            .create_resource(local_resource("demo"))
            .await
            .expect("create");

        let chunk = |path: &str| NewChunk {
            filepath: path.to_string(),
            line_start: 1,
            line_end: 2,
            text: "alpha".to_string(),
            contextualized_text: format!("// {path}\nalpha"),
            scope: None,
            entities: vec![],
            language: None,
            embedding: None,
        };

        store
            .replace_chunks(&resource.id, vec![chunk("a.txt"), chunk("b.txt")])
            .await
            .expect("first replace");
        assert_eq!(store.chunk_count(&resource.id), 2);

        store
            .replace_chunks(&resource.id, vec![chunk("c.txt")])
            .await
            .expect("second replace");
        assert_eq!(store.chunk_count(&resource.id), 1, "old set fully removed");

        // Empty new set still deletes
        store
            .replace_chunks(&resource.id, vec![])
            .await
            .expect("empty replace");
        assert_eq!(store.chunk_count(&resource.id), 0);
    }

    #[tokio::test]
    async fn test_job_queue_is_fifo_and_terminal_rows_stay_closed() {
        let store = MockStore::new();
        let resource = store
            .create_resource(local_resource("demo"))
            .await
            .expect("create");

        let first = store
            .create_job(&resource.id, JobKind::Sync)
            .await
            .expect("job 1");
        let second = store
            .create_job(&resource.id, JobKind::Index)
            .await
            .expect("job 2");

        let next = store
            .next_queued_job(&resource.id)
            .await
            .expect("query")
            .expect("job available");
        assert_eq!(next.id, first.id, "oldest job first");

        store.mark_job_running(&first.id).await.expect("running");
        store
            .complete_job(&first.id, JobStatus::Completed, None)
            .await
            .expect("complete");

        // Terminal row cannot be reopened
        assert!(store.mark_job_running(&first.id).await.is_err());

        let next = store
            .next_queued_job(&resource.id)
            .await
            .expect("query")
            .expect("second job");
        assert_eq!(next.id, second.id);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let store = MockStore::new();
        let resource = store
            .create_resource(local_resource("demo"))
            .await
            .expect("create");
        let job = store
            .create_job(&resource.id, JobKind::Index)
            .await
            .expect("job");
        store.mark_job_running(&job.id).await.expect("running");

        store.update_job_progress(&job.id, 40, 1).await.expect("40");
        store.update_job_progress(&job.id, 10, 2).await.expect("10");

        let job = store.get_job(&job.id).await.expect("get").expect("exists");
        assert_eq!(job.progress, 40, "smaller progress writes are ignored");
        assert_eq!(job.processed_files, 2);
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_distance() {
        let store = MockStore::new();
        let resource = store
            .create_resource(local_resource("demo"))
            .await
            .expect("create");

        let mk = |path: &str, v: Vec<f32>| NewChunk {
            filepath: path.to_string(),
            line_start: 1,
            line_end: 1,
            text: path.to_string(),
            contextualized_text: path.to_string(),
            scope: None,
            entities: vec![],
            language: None,
            embedding: Some(v),
        };

        store
            .replace_chunks(
                &resource.id,
                vec![
                    mk("far.txt", vec![0.0, 1.0]),
                    mk("near.txt", vec![1.0, 0.0]),
                ],
            )
            .await
            .expect("insert");

        let hits = store
            .vector_search(&[resource.id], &[1.0, 0.0], 10)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.filepath, "near.txt");
        assert!(hits[0].distance < hits[1].distance);
    }
}
