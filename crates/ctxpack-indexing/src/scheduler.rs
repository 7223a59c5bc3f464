//! Per-resource job scheduler
//!
//! At most one running job per resource across the process; jobs of the
//! same resource execute strictly in queued order, different resources
//! proceed in parallel. Per-request overrides live only while a worker is
//! active and are discarded on release.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::IndexerError;
use crate::pipeline::Indexer;
use ctxpack_common::CorrelationId;
use ctxpack_embeddings::{Embedder, EmbedderOverrides, EmbeddingResult};
use ctxpack_store::{JobStatus, ResourceRepository};

/// Per-request runtime overrides captured by `ensure`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOverrides {
    /// Embedding provider overrides for this resource's next jobs
    pub embedder: Option<EmbedderOverrides>,
}

/// Resolves the embedder a job should use from the captured overrides
pub type EmbedderResolver =
    Arc<dyn Fn(Option<&EmbedderOverrides>) -> EmbeddingResult<Arc<dyn Embedder>> + Send + Sync>;

struct SchedulerInner {
    store: Arc<dyn ResourceRepository>,
    indexer: Indexer,
    resolver: EmbedderResolver,
    /// Resource ids with an active worker; the mutual-exclusion registry
    active: DashMap<Uuid, ()>,
    /// Volatile per-resource overrides; cleared when the worker releases
    overrides: DashMap<Uuid, JobOverrides>,
}

/// The per-resource FIFO job scheduler
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<SchedulerInner>,
}

impl JobScheduler {
    /// Create a scheduler with an explicit embedder resolver
    pub fn new(
        store: Arc<dyn ResourceRepository>,
        indexer: Indexer,
        resolver: EmbedderResolver,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                indexer,
                resolver,
                active: DashMap::new(),
                overrides: DashMap::new(),
            }),
        }
    }

    /// Create a scheduler that always uses one embedder, ignoring overrides
    pub fn with_fixed_embedder(
        store: Arc<dyn ResourceRepository>,
        indexer: Indexer,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self::new(store, indexer, Arc::new(move |_| Ok(Arc::clone(&embedder))))
    }

    /// Record the latest per-request overrides for a resource and spawn a
    /// worker if none is active
    ///
    /// Safe to call repeatedly; a running worker picks up queued jobs on
    /// its own.
    pub fn ensure(&self, resource_id: Uuid, overrides: Option<JobOverrides>) {
        if let Some(overrides) = overrides {
            self.inner.overrides.insert(resource_id, overrides);
        }

        // Claim the resource slot; an existing worker keeps it
        if self.inner.active.insert(resource_id, ()).is_none() {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                worker(inner, resource_id).await;
            });
        }
    }

    /// Whether a worker is currently active for a resource (tests,
    /// diagnostics)
    pub fn is_active(&self, resource_id: &Uuid) -> bool {
        self.inner.active.contains_key(resource_id)
    }
}

/// Worker loop: drain the resource's queue in strict (created_at, id) order,
/// then release the slot. A finalizer-style re-check closes the window where
/// a job lands between "queue empty" and the release.
async fn worker(inner: Arc<SchedulerInner>, resource_id: Uuid) {
    loop {
        drain_queue(&inner, resource_id).await;

        // Release in all cases, then double-check for late arrivals
        inner.active.remove(&resource_id);
        inner.overrides.remove(&resource_id);

        let late_arrival = inner
            .store
            .next_queued_job(&resource_id)
            .await
            .ok()
            .flatten()
            .is_some();
        if late_arrival && inner.active.insert(resource_id, ()).is_none() {
            // Re-claimed the slot; keep draining
            continue;
        }
        break;
    }
}

/// Run queued jobs until the queue is empty or the store stops cooperating
async fn drain_queue(inner: &Arc<SchedulerInner>, resource_id: Uuid) {
    loop {
        let next = match inner.store.next_queued_job(&resource_id).await {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(resource = %resource_id, error = %e, "queue poll failed");
                break;
            }
        };
        let Some(job) = next else { break };

        let job = match inner.store.mark_job_running(&job.id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job = %job.id, error = %e, "failed to start job");
                break;
            }
        };

        let correlation_id = CorrelationId::new();
        let outcome = run_one(inner, resource_id, &job).await;
        let (status, error) = match &outcome {
            Ok(()) => (JobStatus::Completed, None),
            Err(e) => (JobStatus::Failed, Some(e.to_string())),
        };
        if let Err(e) = inner
            .store
            .complete_job(&job.id, status, error.as_deref())
            .await
        {
            tracing::error!(job = %job.id, error = %e, "failed to finalize job");
            break;
        }

        match outcome {
            Ok(()) => {
                tracing::info!(
                    correlation_id = %correlation_id,
                    job = %job.id,
                    resource = %resource_id,
                    kind = %job.kind,
                    "job completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    job = %job.id,
                    resource = %resource_id,
                    error = %e,
                    "job failed"
                );
            }
        }
    }
}

/// Execute a single job: re-resolve the resource, resolve the embedder from
/// the captured overrides, and run the pipeline
async fn run_one(
    inner: &Arc<SchedulerInner>,
    resource_id: Uuid,
    job: &ctxpack_store::IndexJob,
) -> Result<(), IndexerError> {
    // The scheduler weakly references resources: re-resolve on each step
    let resource = inner
        .store
        .get_resource(&resource_id)
        .await?
        .ok_or(IndexerError::ResourceNotFound(resource_id))?;

    let overrides = inner.overrides.get(&resource_id).map(|o| o.value().clone());
    let embedder = (*inner.resolver)(overrides.as_ref().and_then(|o| o.embedder.as_ref()))?;

    inner.indexer.run_job(&resource, job, &embedder).await
}
