//! Asynchronous deep-research jobs
//!
//! A research job row is created queued, the driver runs in the background
//! under the supervisor, and the final outcome (or failure) is written back
//! to the row. Failed jobs are never retried by the core.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::driver::{AgentDriver, AgentMode};
use crate::error::AgentResult;
use crate::tools::SearchDefaults;
use ctxpack_indexing::Supervisor;
use ctxpack_store::{ResearchJob, ResearchJobRepository, ResearchOptions};

/// Deadline for one background research run
const RESEARCH_DEADLINE: Duration = Duration::from_secs(15 * 60);

/// Runs research jobs in the background
#[derive(Clone)]
pub struct ResearchRunner {
    driver: AgentDriver,
    store: Arc<dyn ResearchJobRepository>,
    supervisor: Arc<Supervisor>,
}

impl ResearchRunner {
    /// Create a research runner
    pub fn new(
        driver: AgentDriver,
        store: Arc<dyn ResearchJobRepository>,
        supervisor: Arc<Supervisor>,
    ) -> Self {
        Self {
            driver,
            store,
            supervisor,
        }
    }

    /// Create a queued research job and start it in the background
    ///
    /// # Errors
    ///
    /// Returns store errors from creating the job row; the run itself
    /// reports through the row, not through this call.
    pub async fn start(
        &self,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
        options: ResearchOptions,
    ) -> AgentResult<ResearchJob> {
        let job = self
            .store
            .create_research_job(owner_id, query, resource_ids, &options)
            .await?;

        let runner = self.clone();
        let job_id = job.id;
        let owner = owner_id.map(ToString::to_string);
        let query = query.to_string();
        let ids = resource_ids.to_vec();
        self.supervisor
            .spawn("research-job", RESEARCH_DEADLINE, async move {
                runner
                    .execute(job_id, owner.as_deref(), &query, &ids, options)
                    .await;
            });

        Ok(job)
    }

    /// The background body: run deep research and persist the outcome
    #[tracing::instrument(skip(self, query, options), fields(job_id = %job_id))]
    async fn execute(
        &self,
        job_id: Uuid,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
        options: ResearchOptions,
    ) {
        if let Err(e) = self.store.mark_research_running(&job_id).await {
            tracing::error!(error = %e, "failed to mark research job running");
            return;
        }

        let defaults = SearchDefaults {
            mode: options.mode,
            alpha: options.alpha,
            top_k: options.top_k,
        };

        let write_back = match self
            .driver
            .run_with_options(AgentMode::Research, owner_id, query, resource_ids, defaults)
            .await
        {
            Ok(outcome) => match serde_json::to_value(&outcome) {
                Ok(result) => self.store.complete_research_job(&job_id, result).await,
                Err(e) => {
                    self.store
                        .fail_research_job(&job_id, &format!("unserializable result: {e}"))
                        .await
                }
            },
            Err(failure) => {
                self.store
                    .fail_research_job(&job_id, &failure.error.to_string())
                    .await
            }
        };

        if let Err(e) = write_back {
            tracing::error!(error = %e, "failed to persist research outcome");
        }
    }
}
