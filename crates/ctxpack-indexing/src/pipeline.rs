//! The indexer pipeline: sync and index jobs end to end
//!
//! Sync materializes content and records commit metadata; index scans,
//! chunks, embeds, and atomically replaces the persisted chunk set.
//! Per-file problems become warnings on the job row; only unrecoverable
//! conditions fail a job.

use std::sync::Arc;

use crate::error::{IndexerError, IndexerResult};
use ctxpack_chunking::{Chunker, FileInput};
use ctxpack_config::IndexingConfig;
use ctxpack_embeddings::Embedder;
use ctxpack_git::{Materializer, apply_scoped_paths, local_files, validate_local_root};
use ctxpack_store::{
    ContentStatus, IndexJob, JobWarning, NewChunk, Resource, ResourceKind, ResourceRepository,
    VectorStatus, WarningStage,
};

/// Chunks embedded per provider call
pub const EMBED_BATCH_SIZE: usize = 100;

/// Progress checkpoints for an index job
const PROGRESS_AFTER_SCAN: i32 = 10;
const PROGRESS_EMPTY_SCAN: i32 = 95;
const PROGRESS_AFTER_CHUNKING: i32 = 40;
const PROGRESS_EMBED_SPAN: i32 = 55;
const PROGRESS_CAP: i32 = 95;

/// Drives sync and index jobs against the store and the filesystem
pub struct Indexer {
    store: Arc<dyn ResourceRepository>,
    materializer: Materializer,
    chunker: Chunker,
    config: IndexingConfig,
}

impl Indexer {
    /// Create an indexer
    pub fn new(
        store: Arc<dyn ResourceRepository>,
        materializer: Materializer,
        chunker: Chunker,
        config: IndexingConfig,
    ) -> Self {
        Self {
            store,
            materializer,
            chunker,
            config,
        }
    }

    /// Run one job to completion
    ///
    /// # Errors
    ///
    /// Propagates fatal errors after recording the failed status on the
    /// owning resource; the scheduler writes the terminal job row.
    pub async fn run_job(
        &self,
        resource: &Resource,
        job: &IndexJob,
        embedder: &Arc<dyn Embedder>,
    ) -> IndexerResult<()> {
        match job.kind {
            ctxpack_store::JobKind::Sync => self.run_sync(resource, job).await,
            ctxpack_store::JobKind::Index => self.run_index(resource, job, embedder).await,
        }
    }

    /// Sync: materialize content and record commit metadata
    ///
    /// # Errors
    ///
    /// Fatal failures set `content_status = failed` with the message before
    /// propagating.
    #[tracing::instrument(skip_all, fields(resource_id = %resource.id, job_id = %job.id))]
    pub async fn run_sync(&self, resource: &Resource, job: &IndexJob) -> IndexerResult<()> {
        self.store
            .set_content_status(&resource.id, ContentStatus::Syncing, None)
            .await?;

        match self.sync_inner(resource, job).await {
            Ok(()) => {
                self.store
                    .set_content_status(&resource.id, ContentStatus::Ready, None)
                    .await?;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.store
                    .set_content_status(&resource.id, ContentStatus::Failed, Some(&message))
                    .await?;
                Err(e)
            }
        }
    }

    async fn sync_inner(&self, resource: &Resource, job: &IndexJob) -> IndexerResult<()> {
        match resource.kind {
            ResourceKind::Git => {
                let dir = self.materializer.prepare(resource).await?;
                let tracked = self.materializer.list_tracked(&dir).await?;
                let files = apply_scoped_paths(tracked, resource.scoped_paths.as_deref());

                let local = self.materializer.head_commit(&dir).await;
                let remote = match resource.url.as_deref() {
                    Some(url) => {
                        self.materializer
                            .remote_head(url, resource.branch.as_deref())
                            .await
                    }
                    None => None,
                };
                let update_available = match (&local, &remote) {
                    (Some(l), Some(r)) => Some(l != r),
                    _ => None,
                };

                self.store
                    .set_job_totals(&job.id, clamp_i32(files.len()))
                    .await?;
                self.store
                    .record_sync(
                        &resource.id,
                        local.as_deref(),
                        remote.as_deref(),
                        update_available,
                    )
                    .await?;
            }
            ResourceKind::Local => {
                let path = resource.path.clone().unwrap_or_default();
                let root = validate_local_root(&path)?;
                let files = local_files(&root, resource.scoped_paths.as_deref())?;

                // Local trees may still be git repos; the commit is advisory
                let local = self.materializer.head_commit(&root).await;

                self.store
                    .set_job_totals(&job.id, clamp_i32(files.len()))
                    .await?;
                self.store
                    .record_sync(&resource.id, local.as_deref(), None, None)
                    .await?;
            }
        }
        Ok(())
    }

    /// Index: scan, chunk, embed, and atomically replace the chunk set
    ///
    /// # Errors
    ///
    /// Fatal failures set `vector_status = failed` with the message before
    /// propagating.
    #[tracing::instrument(skip_all, fields(resource_id = %resource.id, job_id = %job.id))]
    pub async fn run_index(
        &self,
        resource: &Resource,
        job: &IndexJob,
        embedder: &Arc<dyn Embedder>,
    ) -> IndexerResult<()> {
        self.store
            .set_vector_status(&resource.id, VectorStatus::Indexing, None)
            .await?;

        match self.index_inner(resource, job, embedder).await {
            Ok(()) => {
                self.store
                    .set_vector_status(&resource.id, VectorStatus::Ready, None)
                    .await?;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.store
                    .set_vector_status(&resource.id, VectorStatus::Failed, Some(&message))
                    .await?;
                Err(e)
            }
        }
    }

    async fn index_inner(
        &self,
        resource: &Resource,
        job: &IndexJob,
        embedder: &Arc<dyn Embedder>,
    ) -> IndexerResult<()> {
        let (root, files) = self.resolve_files(resource).await?;
        let total_files = files.len();
        self.store
            .set_job_totals(&job.id, clamp_i32(total_files))
            .await?;

        if total_files == 0 {
            // Still a clean completion: the chunk set is replaced with the
            // empty set so stale chunks never linger
            self.store
                .update_job_progress(&job.id, PROGRESS_EMPTY_SCAN, 0)
                .await?;
            self.store.replace_chunks(&resource.id, Vec::new()).await?;
            self.store.finish_index(&resource.id, 0).await?;
            return Ok(());
        }

        let inputs = self.scan_files(&root, &files, job).await?;
        let scanned = clamp_i32(inputs.len());
        self.store
            .update_job_progress(&job.id, PROGRESS_AFTER_SCAN, scanned)
            .await?;

        let drafts = self.chunk_inputs(&inputs, job).await?;
        self.store
            .update_job_progress(&job.id, PROGRESS_AFTER_CHUNKING, scanned)
            .await?;

        let chunks = self.embed_drafts(drafts, embedder, job, scanned).await?;
        let inserted = self.store.replace_chunks(&resource.id, chunks).await?;
        self.store
            .finish_index(&resource.id, i64::try_from(inserted).unwrap_or(i64::MAX))
            .await?;

        Ok(())
    }

    /// Resolve the file list by resource kind
    async fn resolve_files(
        &self,
        resource: &Resource,
    ) -> IndexerResult<(std::path::PathBuf, Vec<String>)> {
        match resource.kind {
            ResourceKind::Git => {
                let dir = self.materializer.dir_for(&resource.id);
                if !dir.join(".git").is_dir() {
                    return Err(IndexerError::MaterializedPathMissing(resource.id));
                }
                let tracked = self.materializer.list_tracked(&dir).await?;
                Ok((
                    dir,
                    apply_scoped_paths(tracked, resource.scoped_paths.as_deref()),
                ))
            }
            ResourceKind::Local => {
                let path = resource.path.clone().unwrap_or_default();
                let root = validate_local_root(&path)?;
                let files = local_files(&root, resource.scoped_paths.as_deref())?;
                Ok((root, files))
            }
        }
    }

    /// Read files into chunker inputs, converting per-file problems into
    /// read-stage warnings
    async fn scan_files(
        &self,
        root: &std::path::Path,
        files: &[String],
        job: &IndexJob,
    ) -> IndexerResult<Vec<FileInput>> {
        let mut inputs = Vec::new();

        for filepath in files {
            let full = root.join(filepath);

            let metadata = match tokio::fs::metadata(&full).await {
                Ok(m) => m,
                Err(e) => {
                    self.warn(job, filepath, WarningStage::Read, &format!("stat failed: {e}"))
                        .await?;
                    continue;
                }
            };
            if metadata.len() > self.config.max_file_size_bytes {
                self.warn(
                    job,
                    filepath,
                    WarningStage::Read,
                    &format!(
                        "file exceeds {} bytes ({}), skipped",
                        self.config.max_file_size_bytes,
                        metadata.len()
                    ),
                )
                .await?;
                continue;
            }

            let bytes = match tokio::fs::read(&full).await {
                Ok(b) => b,
                Err(e) => {
                    self.warn(job, filepath, WarningStage::Read, &format!("read failed: {e}"))
                        .await?;
                    continue;
                }
            };
            if bytes.contains(&0) {
                self.warn(job, filepath, WarningStage::Read, "binary file skipped")
                    .await?;
                continue;
            }

            inputs.push(FileInput {
                filepath: filepath.clone(),
                code: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(inputs)
    }

    /// Chunk all inputs, converting per-file chunker errors into chunk-stage
    /// warnings; returns the flattened ordered draft list
    async fn chunk_inputs(
        &self,
        inputs: &[FileInput],
        job: &IndexJob,
    ) -> IndexerResult<Vec<ctxpack_chunking::ChunkDraft>> {
        let mut drafts = Vec::new();
        for outcome in self.chunker.chunk_files(inputs) {
            match outcome.result {
                Ok(chunks) => drafts.extend(chunks),
                Err(e) => {
                    self.warn(job, &outcome.filepath, WarningStage::Chunk, &e.to_string())
                        .await?;
                }
            }
        }
        Ok(drafts)
    }

    /// Embed drafts in batches, tolerating batch and per-item failures
    ///
    /// A failed batch leaves its chunks without vectors and records one
    /// embed-stage warning; a gap in a successful batch records one warning
    /// for that chunk.
    async fn embed_drafts(
        &self,
        drafts: Vec<ctxpack_chunking::ChunkDraft>,
        embedder: &Arc<dyn Embedder>,
        job: &IndexJob,
        processed_files: i32,
    ) -> IndexerResult<Vec<NewChunk>> {
        let total_batches = drafts.len().div_ceil(EMBED_BATCH_SIZE).max(1);
        let mut chunks = Vec::with_capacity(drafts.len());

        for (batch_index, batch) in drafts.chunks(EMBED_BATCH_SIZE).enumerate() {
            let texts: Vec<String> =
                batch.iter().map(|d| d.contextualized_text.clone()).collect();

            let (vectors, batch_failed) = match embedder.embed_many(&texts).await {
                Ok(vectors) => (vectors, false),
                Err(e) => {
                    let first_file = batch
                        .first()
                        .map_or_else(String::new, |d| d.filepath.clone());
                    self.warn(
                        job,
                        &first_file,
                        WarningStage::Embed,
                        &format!(
                            "embedding batch {batch_index} failed, {} chunks stored without vectors: {e}",
                            batch.len()
                        ),
                    )
                    .await?;
                    (vec![None; batch.len()], true)
                }
            };

            for (draft, vector) in batch.iter().zip(vectors.into_iter()) {
                // Batch-level failures already warned once above
                if vector.is_none() && !batch_failed {
                    self.warn(
                        job,
                        &draft.filepath,
                        WarningStage::Embed,
                        "provider returned no embedding for this chunk",
                    )
                    .await?;
                }
                chunks.push(NewChunk {
                    filepath: draft.filepath.clone(),
                    line_start: draft.line_start,
                    line_end: draft.line_end,
                    text: draft.text.clone(),
                    contextualized_text: draft.contextualized_text.clone(),
                    scope: draft.scope.clone(),
                    entities: draft.entities.clone(),
                    language: draft.language.clone(),
                    embedding: vector,
                });
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let progress = PROGRESS_AFTER_CHUNKING
                + ((batch_index + 1) * PROGRESS_EMBED_SPAN as usize / total_batches) as i32;
            self.store
                .update_job_progress(&job.id, progress.min(PROGRESS_CAP), processed_files)
                .await?;
        }

        Ok(chunks)
    }

    async fn warn(
        &self,
        job: &IndexJob,
        filepath: &str,
        stage: WarningStage,
        message: &str,
    ) -> IndexerResult<()> {
        tracing::debug!(job_id = %job.id, filepath, ?stage, message, "job warning");
        self.store
            .append_job_warning(
                &job.id,
                &JobWarning {
                    filepath: filepath.to_string(),
                    stage,
                    message: message.to_string(),
                },
            )
            .await?;
        Ok(())
    }
}

fn clamp_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
