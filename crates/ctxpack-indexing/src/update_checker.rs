//! Background update checker
//!
//! Compares the local HEAD of each materialized git resource against the
//! remote branch head and flags resources with newer remote content.
//! Fire-and-forget: failures are logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::supervisor::Supervisor;
use ctxpack_git::Materializer;
use ctxpack_store::{ContentStatus, ResourceKind, ResourceRepository};

/// Deadline for one background check sweep
const CHECK_DEADLINE: Duration = Duration::from_secs(120);

/// Checks git resources for upstream movement
#[derive(Clone)]
pub struct UpdateChecker {
    store: Arc<dyn ResourceRepository>,
    materializer: Materializer,
    supervisor: Arc<Supervisor>,
}

impl UpdateChecker {
    /// Create an update checker
    pub fn new(
        store: Arc<dyn ResourceRepository>,
        materializer: Materializer,
        supervisor: Arc<Supervisor>,
    ) -> Self {
        Self {
            store,
            materializer,
            supervisor,
        }
    }

    /// Schedule a background check over the given resources; returns
    /// immediately
    pub fn schedule(&self, resource_ids: Vec<Uuid>) {
        let checker = self.clone();
        self.supervisor
            .spawn("update-check", CHECK_DEADLINE, async move {
                checker.run(&resource_ids).await;
            });
    }

    /// Run a check sweep inline (the background task body)
    #[tracing::instrument(skip(self, resource_ids), fields(count = resource_ids.len()))]
    pub async fn run(&self, resource_ids: &[Uuid]) {
        for id in resource_ids {
            if let Err(e) = self.check_one(id).await {
                tracing::warn!(resource = %id, error = %e, "update check failed");
            }
        }
    }

    async fn check_one(&self, id: &Uuid) -> Result<(), ctxpack_store::StoreError> {
        let Some(resource) = self.store.get_resource(id).await? else {
            return Ok(());
        };
        if resource.kind != ResourceKind::Git
            || resource.content_status != ContentStatus::Ready
        {
            return Ok(());
        }

        let dir = self.materializer.dir_for(id);
        if !dir.is_dir() {
            // Nothing materialized to compare against
            return self.store.touch_update_check(id).await;
        }

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
            .record_update_check(id, local.as_deref(), remote.as_deref(), update_available)
            .await
    }
}
