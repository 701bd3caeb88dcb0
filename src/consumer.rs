//! # Consumer Core
//!
//! The production notification handler: one claim-and-process cycle per
//! matching notification. Single logical worker: a task runs to
//! completion before the next frame is processed; horizontal scale comes
//! from running more processes, which is safe because claims are atomic
//! at the queue store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::TaskNotification;
use crate::listener::NotificationHandler;
use crate::pipeline::PipelineOrchestrator;
use crate::queue::{QueueStore, TaskClaimService};

/// Claims tasks and drives them through the pipeline
pub struct ConsumerCore {
    claims: TaskClaimService,
    orchestrator: PipelineOrchestrator,
    store: Arc<dyn QueueStore>,
    processed: AtomicU64,
}

impl ConsumerCore {
    pub fn new(
        claims: TaskClaimService,
        orchestrator: PipelineOrchestrator,
        store: Arc<dyn QueueStore>,
    ) -> Self {
        Self {
            claims,
            orchestrator,
            store,
            processed: AtomicU64::new(0),
        }
    }

    /// Tasks completed with a published artifact since startup.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NotificationHandler for ConsumerCore {
    async fn on_task_ready(&self, notification: TaskNotification) -> Result<()> {
        // The notification is only a hint; the claim decides what runs.
        let Some(task) = self.claims.claim().await? else {
            let depth = self.store.queue_len().await.unwrap_or_default();
            info!(
                notified_task_id = %notification.task_id,
                queue_len = depth,
                "Stale notification, nothing claimable"
            );
            return Ok(());
        };

        info!(task_id = %task.id, priority = task.priority, "📥 Claimed task");

        match self.orchestrator.process(&task).await {
            Some(artifact) => {
                let total = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    task_id = %task.id,
                    url = %artifact.url,
                    total_processed = total,
                    "🎉 Task finished"
                );
            }
            None => {
                warn!(task_id = %task.id, "Task did not complete");
            }
        }

        Ok(())
    }
}
