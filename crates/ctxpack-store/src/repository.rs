//! Postgres repository layer
//!
//! Implements the store traits against sqlx/Postgres with a pgvector column
//! for chunk embeddings. Enum-ish columns are TEXT and parsed at the row
//! boundary; a value the model cannot represent surfaces as `CorruptRow`
//! rather than a panic.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{StoreError, StoreErrorExt, StoreOperation, StoreResult};
use crate::git_url::normalize_git_url;
use crate::identity::{chunk_hash, chunk_id};
use crate::models::{
    Chunk, ChunkHit, ContentStatus, IndexJob, JobKind, JobStatus, JobWarning, NewChunk,
    NewResource, ResearchJob, ResearchOptions, Resource, ResourceKind, VectorStatus,
};
use crate::traits::{ResearchJobRepository, ResourceRepository};

/// Repository backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool (tests, migrations)
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Parse a TEXT column into one of the model enums
fn parse_column<T>(raw: String, operation: StoreOperation) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|message| StoreError::CorruptRow {
        operation: Box::new(operation),
        message,
    })
}

fn resource_from_row(row: &PgRow) -> StoreResult<Resource> {
    let id: Uuid = row
        .try_get("id")
        .map_store_err(StoreOperation::ListResources)?;
    let op = || StoreOperation::GetResource { id };

    Ok(Resource {
        id,
        owner_id: row.try_get("owner_id").map_store_err(op())?,
        name: row.try_get("name").map_store_err(op())?,
        scope: parse_column(row.try_get("scope").map_store_err(op())?, op())?,
        project_key: row.try_get("project_key").map_store_err(op())?,
        kind: parse_column(row.try_get("kind").map_store_err(op())?, op())?,
        url: row.try_get("url").map_store_err(op())?,
        path: row.try_get("path").map_store_err(op())?,
        branch: row.try_get("branch").map_store_err(op())?,
        commit: row.try_get("commit_pin").map_store_err(op())?,
        scoped_paths: row.try_get("scoped_paths").map_store_err(op())?,
        notes: row.try_get("notes").map_store_err(op())?,
        content_status: parse_column(row.try_get("content_status").map_store_err(op())?, op())?,
        vector_status: parse_column(row.try_get("vector_status").map_store_err(op())?, op())?,
        content_error: row.try_get("content_error").map_store_err(op())?,
        vector_error: row.try_get("vector_error").map_store_err(op())?,
        chunk_count: row.try_get("chunk_count").map_store_err(op())?,
        last_synced_at: row.try_get("last_synced_at").map_store_err(op())?,
        last_indexed_at: row.try_get("last_indexed_at").map_store_err(op())?,
        last_local_commit: row.try_get("last_local_commit").map_store_err(op())?,
        last_remote_commit: row.try_get("last_remote_commit").map_store_err(op())?,
        update_available: row.try_get("update_available").map_store_err(op())?,
        last_update_check_at: row.try_get("last_update_check_at").map_store_err(op())?,
        created_at: row.try_get("created_at").map_store_err(op())?,
        updated_at: row.try_get("updated_at").map_store_err(op())?,
    })
}

fn job_from_row(row: &PgRow) -> StoreResult<IndexJob> {
    let id: Uuid = row
        .try_get("id")
        .map_store_err(StoreOperation::Query {
            description: "job row id".to_string(),
        })?;
    let op = || StoreOperation::GetJob { job_id: id };

    let warnings_json: serde_json::Value = row.try_get("warnings").map_store_err(op())?;
    let warnings: Vec<JobWarning> =
        serde_json::from_value(warnings_json).map_err(|e| StoreError::CorruptRow {
            operation: Box::new(op()),
            message: format!("warnings column: {e}"),
        })?;

    Ok(IndexJob {
        id,
        resource_id: row.try_get("resource_id").map_store_err(op())?,
        kind: parse_column(row.try_get("kind").map_store_err(op())?, op())?,
        status: parse_column(row.try_get("status").map_store_err(op())?, op())?,
        progress: row.try_get("progress").map_store_err(op())?,
        error: row.try_get("error").map_store_err(op())?,
        warnings,
        total_files: row.try_get("total_files").map_store_err(op())?,
        processed_files: row.try_get("processed_files").map_store_err(op())?,
        started_at: row.try_get("started_at").map_store_err(op())?,
        completed_at: row.try_get("completed_at").map_store_err(op())?,
        created_at: row.try_get("created_at").map_store_err(op())?,
    })
}

fn chunk_from_row(row: &PgRow) -> StoreResult<Chunk> {
    let op = || StoreOperation::Query {
        description: "chunk row".to_string(),
    };
    let embedding: Option<pgvector::Vector> = row.try_get("embedding").map_store_err(op())?;

    Ok(Chunk {
        id: row.try_get("id").map_store_err(op())?,
        resource_id: row.try_get("resource_id").map_store_err(op())?,
        filepath: row.try_get("filepath").map_store_err(op())?,
        line_start: row.try_get("line_start").map_store_err(op())?,
        line_end: row.try_get("line_end").map_store_err(op())?,
        text: row.try_get("text").map_store_err(op())?,
        contextualized_text: row.try_get("contextualized_text").map_store_err(op())?,
        scope: row.try_get("scope").map_store_err(op())?,
        entities: row.try_get("entities").map_store_err(op())?,
        language: row.try_get("language").map_store_err(op())?,
        hash: row.try_get("hash").map_store_err(op())?,
        embedding: embedding.map(|v| v.to_vec()),
        created_at: row.try_get("created_at").map_store_err(op())?,
    })
}

fn research_from_row(row: &PgRow) -> StoreResult<ResearchJob> {
    let op = || StoreOperation::Query {
        description: "research job row".to_string(),
    };

    let options_json: serde_json::Value = row.try_get("options").map_store_err(op())?;
    let options: ResearchOptions =
        serde_json::from_value(options_json).map_err(|e| StoreError::CorruptRow {
            operation: Box::new(op()),
            message: format!("options column: {e}"),
        })?;

    Ok(ResearchJob {
        id: row.try_get("id").map_store_err(op())?,
        owner_id: row.try_get("owner_id").map_store_err(op())?,
        query: row.try_get("query").map_store_err(op())?,
        resource_ids: row.try_get("resource_ids").map_store_err(op())?,
        options,
        status: parse_column(row.try_get("status").map_store_err(op())?, op())?,
        result: row.try_get("result").map_store_err(op())?,
        error: row.try_get("error").map_store_err(op())?,
        started_at: row.try_get("started_at").map_store_err(op())?,
        completed_at: row.try_get("completed_at").map_store_err(op())?,
        created_at: row.try_get("created_at").map_store_err(op())?,
    })
}

const RESOURCE_COLUMNS: &str = "id, owner_id, name, scope, project_key, kind, url, path, branch, \
     commit_pin, scoped_paths, notes, content_status, vector_status, content_error, \
     vector_error, chunk_count, last_synced_at, last_indexed_at, last_local_commit, \
     last_remote_commit, update_available, last_update_check_at, created_at, updated_at";

const JOB_COLUMNS: &str = "id, resource_id, kind, status, progress, error, warnings, \
     total_files, processed_files, started_at, completed_at, created_at";

#[async_trait]
impl ResourceRepository for PgStore {
    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    async fn create_resource(&self, new: NewResource) -> StoreResult<Resource> {
        new.validate().map_err(StoreError::validation)?;

        let operation = StoreOperation::CreateResource {
            name: new.name.clone(),
        };

        // The unique index catches name collisions; the same repository
        // under a different URL spelling is caught here
        if new.kind == ResourceKind::Git
            && let Some(url) = new.url.as_deref()
        {
            let normalized = normalize_git_url(url);
            let rows = sqlx::query(
                "SELECT url FROM resources \
                 WHERE kind = 'git' AND COALESCE(owner_id, '') = COALESCE($1, '') \
                   AND scope = $2 AND project_key = $3 AND url IS NOT NULL",
            )
            .bind(&new.owner_id)
            .bind(new.scope.to_string())
            .bind(&new.project_key)
            .fetch_all(&self.pool)
            .await
            .map_store_err(operation.clone())?;

            for row in &rows {
                let existing: String = row.try_get("url").map_store_err(operation.clone())?;
                if normalize_git_url(&existing) == normalized {
                    return Err(StoreError::Conflict {
                        message: format!(
                            "a resource for {normalized} already exists in this scope"
                        ),
                    });
                }
            }
        }

        let id = Uuid::new_v4();

        let row = sqlx::query(&format!(
            r"
            INSERT INTO resources
                (id, owner_id, name, scope, project_key, kind, url, path, branch,
                 commit_pin, scoped_paths, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {RESOURCE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&new.owner_id)
        .bind(&new.name)
        .bind(new.scope.to_string())
        .bind(&new.project_key)
        .bind(new.kind.to_string())
        .bind(&new.url)
        .bind(&new.path)
        .bind(&new.branch)
        .bind(&new.commit)
        .bind(&new.scoped_paths)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await
        .map_store_err(operation)?;

        resource_from_row(&row)
    }

    async fn get_resource(&self, id: &Uuid) -> StoreResult<Option<Resource>> {
        let row = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_store_err(StoreOperation::GetResource { id: *id })?;

        row.as_ref().map(resource_from_row).transpose()
    }

    async fn list_resources(&self, owner_id: Option<&str>) -> StoreResult<Vec<Resource>> {
        let rows = match owner_id {
            Some(owner) => {
                sqlx::query(&format!(
                    "SELECT {RESOURCE_COLUMNS} FROM resources \
                     WHERE owner_id = $1 OR owner_id IS NULL \
                     ORDER BY created_at"
                ))
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {RESOURCE_COLUMNS} FROM resources \
                     WHERE owner_id IS NULL ORDER BY created_at"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_store_err(StoreOperation::ListResources)?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn resources_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Resource>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ANY($1) ORDER BY created_at"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_store_err(StoreOperation::ListResources)?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn delete_resource(&self, id: &Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_store_err(StoreOperation::DeleteResource { id: *id })?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_content_status(
        &self,
        id: &Uuid,
        status: ContentStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE resources SET content_status = $2, content_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResource { id: *id })?;
        Ok(())
    }

    async fn set_vector_status(
        &self,
        id: &Uuid,
        status: VectorStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE resources SET vector_status = $2, vector_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResource { id: *id })?;
        Ok(())
    }

    async fn record_sync(
        &self,
        id: &Uuid,
        local_commit: Option<&str>,
        remote_commit: Option<&str>,
        update_available: Option<bool>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE resources SET last_local_commit = $2, last_remote_commit = $3, \
             update_available = COALESCE($4, update_available), \
             last_synced_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(local_commit)
        .bind(remote_commit)
        .bind(update_available)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResource { id: *id })?;
        Ok(())
    }

    async fn record_update_check(
        &self,
        id: &Uuid,
        local_commit: Option<&str>,
        remote_commit: Option<&str>,
        update_available: Option<bool>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE resources SET last_local_commit = $2, last_remote_commit = $3, \
             update_available = COALESCE($4, update_available), \
             last_update_check_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(local_commit)
        .bind(remote_commit)
        .bind(update_available)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResource { id: *id })?;
        Ok(())
    }

    async fn touch_update_check(&self, id: &Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE resources SET last_update_check_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_store_err(StoreOperation::UpdateResource { id: *id })?;
        Ok(())
    }

    async fn finish_index(&self, id: &Uuid, chunk_count: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE resources SET chunk_count = $2, last_indexed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(chunk_count)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResource { id: *id })?;
        Ok(())
    }

    #[tracing::instrument(skip(self, chunks), fields(resource_id = %resource_id, count = chunks.len()))]
    async fn replace_chunks(&self, resource_id: &Uuid, chunks: Vec<NewChunk>) -> StoreResult<u64> {
        let operation = StoreOperation::ReplaceChunks {
            resource_id: *resource_id,
            count: chunks.len(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_store_err(StoreOperation::ReplaceChunks {
                resource_id: *resource_id,
                count: chunks.len(),
            })?;

        sqlx::query("DELETE FROM chunks WHERE resource_id = $1")
            .bind(resource_id)
            .execute(&mut *tx)
            .await
            .map_store_err(operation.clone())?;

        let mut inserted = 0u64;
        for chunk in &chunks {
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
            let embedding = chunk.embedding.clone().map(pgvector::Vector::from);

            sqlx::query(
                r"
                INSERT INTO chunks
                    (id, resource_id, filepath, line_start, line_end, text,
                     contextualized_text, scope, entities, language, hash, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(id)
            .bind(resource_id)
            .bind(&chunk.filepath)
            .bind(chunk.line_start)
            .bind(chunk.line_end)
            .bind(&chunk.text)
            .bind(&chunk.contextualized_text)
            .bind(&chunk.scope)
            .bind(&chunk.entities)
            .bind(&chunk.language)
            .bind(&hash)
            .bind(embedding)
            .execute(&mut *tx)
            .await
            .map_store_err(operation.clone())?;
            inserted += 1;
        }

        tx.commit().await.map_store_err(operation)?;
        Ok(inserted)
    }

    async fn chunks_for_file(
        &self,
        resource_id: &Uuid,
        filepath: &str,
    ) -> StoreResult<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT id, resource_id, filepath, line_start, line_end, text, \
             contextualized_text, scope, entities, language, hash, embedding, created_at \
             FROM chunks WHERE resource_id = $1 AND filepath = $2 \
             ORDER BY line_start, line_end",
        )
        .bind(resource_id)
        .bind(filepath)
        .fetch_all(&self.pool)
        .await
        .map_store_err(StoreOperation::Query {
            description: format!("chunks_for_file({filepath})"),
        })?;

        rows.iter().map(chunk_from_row).collect()
    }

    #[tracing::instrument(skip(self, embedding), fields(resources = resource_ids.len(), limit))]
    async fn vector_search(
        &self,
        resource_ids: &[Uuid],
        embedding: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<ChunkHit>> {
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = pgvector::Vector::from(embedding.to_vec());
        let rows = sqlx::query(
            "SELECT id, resource_id, filepath, line_start, line_end, text, \
             contextualized_text, scope, entities, language, hash, embedding, created_at, \
             (embedding <=> $1) AS distance \
             FROM chunks \
             WHERE resource_id = ANY($2) AND embedding IS NOT NULL \
             ORDER BY embedding <=> $1 \
             LIMIT $3",
        )
        .bind(&query_vector)
        .bind(resource_ids)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_store_err(StoreOperation::VectorSearch { limit })?;

        rows.iter()
            .map(|row| {
                let chunk = chunk_from_row(row)?;
                let distance: f64 = row.try_get("distance").map_store_err(
                    StoreOperation::VectorSearch { limit },
                )?;
                #[allow(clippy::cast_possible_truncation)]
                let distance = distance as f32;
                Ok(ChunkHit { chunk, distance })
            })
            .collect()
    }

    async fn create_job(&self, resource_id: &Uuid, kind: JobKind) -> StoreResult<IndexJob> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            "INSERT INTO index_jobs (id, resource_id, kind) VALUES ($1, $2, $3) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(resource_id)
        .bind(kind.to_string())
        .fetch_one(&self.pool)
        .await
        .map_store_err(StoreOperation::CreateJob {
            resource_id: *resource_id,
        })?;

        job_from_row(&row)
    }

    async fn next_queued_job(&self, resource_id: &Uuid) -> StoreResult<Option<IndexJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM index_jobs \
             WHERE resource_id = $1 AND status = 'queued' \
             ORDER BY created_at, id LIMIT 1"
        ))
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_store_err(StoreOperation::Query {
            description: format!("next_queued_job({resource_id})"),
        })?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn mark_job_running(&self, job_id: &Uuid) -> StoreResult<IndexJob> {
        // The status guard keeps terminal rows closed
        let row = sqlx::query(&format!(
            "UPDATE index_jobs SET status = 'running', started_at = NOW(), progress = 0, \
             processed_files = 0, error = NULL \
             WHERE id = $1 AND status = 'queued' \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateJob { job_id: *job_id })?;

        row.as_ref()
            .map(job_from_row)
            .transpose()?
            .ok_or_else(|| StoreError::job_not_found(*job_id))
    }

    async fn set_job_totals(&self, job_id: &Uuid, total_files: i32) -> StoreResult<()> {
        sqlx::query("UPDATE index_jobs SET total_files = $2 WHERE id = $1 AND status = 'running'")
            .bind(job_id)
            .bind(total_files)
            .execute(&self.pool)
            .await
            .map_store_err(StoreOperation::UpdateJob { job_id: *job_id })?;
        Ok(())
    }

    async fn update_job_progress(
        &self,
        job_id: &Uuid,
        progress: i32,
        processed_files: i32,
    ) -> StoreResult<()> {
        // GREATEST keeps progress monotonic even under out-of-order writes
        sqlx::query(
            "UPDATE index_jobs SET progress = GREATEST(progress, $2), processed_files = $3 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(job_id)
        .bind(progress.clamp(0, 100))
        .bind(processed_files)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateJob { job_id: *job_id })?;
        Ok(())
    }

    async fn append_job_warning(&self, job_id: &Uuid, warning: &JobWarning) -> StoreResult<()> {
        let value = serde_json::to_value(warning).map_err(|e| StoreError::Validation {
            message: format!("unserializable warning: {e}"),
        })?;
        sqlx::query("UPDATE index_jobs SET warnings = warnings || $2::jsonb WHERE id = $1")
            .bind(job_id)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_store_err(StoreOperation::UpdateJob { job_id: *job_id })?;
        Ok(())
    }

    async fn complete_job(
        &self,
        job_id: &Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        if !status.is_terminal() {
            return Err(StoreError::validation(format!(
                "complete_job requires a terminal status, got {status}"
            )));
        }
        sqlx::query(
            "UPDATE index_jobs SET status = $2, error = $3, progress = 100, \
             completed_at = NOW() \
             WHERE id = $1 AND status IN ('queued', 'running')",
        )
        .bind(job_id)
        .bind(status.to_string())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateJob { job_id: *job_id })?;
        Ok(())
    }

    async fn get_job(&self, job_id: &Uuid) -> StoreResult<Option<IndexJob>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM index_jobs WHERE id = $1"))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_store_err(StoreOperation::GetJob { job_id: *job_id })?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self, resource_id: &Uuid) -> StoreResult<Vec<IndexJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM index_jobs WHERE resource_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_store_err(StoreOperation::Query {
            description: format!("list_jobs({resource_id})"),
        })?;

        rows.iter().map(job_from_row).collect()
    }
}

const RESEARCH_COLUMNS: &str = "id, owner_id, query, resource_ids, options, status, result, \
     error, started_at, completed_at, created_at";

#[async_trait]
impl ResearchJobRepository for PgStore {
    async fn create_research_job(
        &self,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
        options: &ResearchOptions,
    ) -> StoreResult<ResearchJob> {
        let options_json =
            serde_json::to_value(options).map_err(|e| StoreError::Validation {
                message: format!("unserializable research options: {e}"),
            })?;

        let row = sqlx::query(&format!(
            "INSERT INTO research_jobs (id, owner_id, query, resource_ids, options) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {RESEARCH_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(query)
        .bind(resource_ids)
        .bind(options_json)
        .fetch_one(&self.pool)
        .await
        .map_store_err(StoreOperation::CreateResearchJob)?;

        research_from_row(&row)
    }

    async fn get_research_job(&self, id: &Uuid) -> StoreResult<Option<ResearchJob>> {
        let row = sqlx::query(&format!(
            "SELECT {RESEARCH_COLUMNS} FROM research_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_store_err(StoreOperation::Query {
            description: format!("get_research_job({id})"),
        })?;

        row.as_ref().map(research_from_row).transpose()
    }

    async fn mark_research_running(&self, id: &Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE research_jobs SET status = 'running', started_at = NOW() \
             WHERE id = $1 AND status = 'queued'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResearchJob { job_id: *id })?;
        Ok(())
    }

    async fn complete_research_job(
        &self,
        id: &Uuid,
        result: serde_json::Value,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE research_jobs SET status = 'completed', result = $2, completed_at = NOW() \
             WHERE id = $1 AND status IN ('queued', 'running')",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResearchJob { job_id: *id })?;
        Ok(())
    }

    async fn fail_research_job(&self, id: &Uuid, error: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE research_jobs SET status = 'failed', error = $2, completed_at = NOW() \
             WHERE id = $1 AND status IN ('queued', 'running')",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_store_err(StoreOperation::UpdateResearchJob { job_id: *id })?;
        Ok(())
    }
}
