//! Task claim service.
//!
//! Wraps the store's atomic claim primitive into one logical operation
//! returning a parsed, exclusively-owned task. Integrity problems (a
//! popped identifier with no payload, or a payload that is not valid
//! JSON) consume the claim, log a warning, and surface as "nothing to
//! do"; there is no task object to report a status against.

use std::sync::Arc;

use tracing::{debug, warn};

use super::QueueStore;
use crate::error::{Result, WorkerError};
use crate::task::{ClaimedTask, TaskPayload};

/// One logical claim operation over the queue store
#[derive(Clone)]
pub struct TaskClaimService {
    store: Arc<dyn QueueStore>,
}

impl TaskClaimService {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Claim the highest-priority task, if any.
    ///
    /// Returns `Ok(None)` when the queue is empty or the claimed entry
    /// fails integrity checks (the claim is consumed either way).
    pub async fn claim(&self) -> Result<Option<ClaimedTask>> {
        let Some(raw) = self.store.claim_lowest().await? else {
            return Ok(None);
        };

        let Some(payload_json) = raw.payload else {
            let err =
                WorkerError::data_integrity(&raw.id, "claimed identifier has no payload entry");
            warn!(task_id = %raw.id, "⚠️  {err}, dropping claim");
            return Ok(None);
        };

        match serde_json::from_str::<TaskPayload>(&payload_json) {
            Ok(payload) => {
                debug!(task_id = %raw.id, priority = raw.priority, "Claimed task");
                Ok(Some(ClaimedTask {
                    id: raw.id,
                    priority: raw.priority,
                    payload,
                }))
            }
            Err(e) => {
                let err = WorkerError::data_integrity(
                    &raw.id,
                    format!("claimed payload is not valid JSON: {e}"),
                );
                warn!(task_id = %raw.id, "⚠️  {err}, dropping claim");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryQueueStore;

    #[tokio::test]
    async fn claim_returns_parsed_task() {
        let store = Arc::new(InMemoryQueueStore::new());
        store
            .enqueue(
                "t-1",
                2.0,
                Some(r#"{"swapImage":"/uploads/a.jpg","targetImage":"/uploads/b.jpg"}"#),
            )
            .await;

        let service = TaskClaimService::new(store);
        let task = service.claim().await.unwrap().unwrap();
        assert_eq!(task.id, "t-1");
        assert_eq!(task.priority, 2.0);
        assert_eq!(task.payload.swap_image.as_deref(), Some("/uploads/a.jpg"));
    }

    #[tokio::test]
    async fn empty_queue_claims_nothing() {
        let service = TaskClaimService::new(Arc::new(InMemoryQueueStore::new()));
        assert!(service.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_payload_consumes_claim() {
        let store = Arc::new(InMemoryQueueStore::new());
        store.enqueue("t-orphan", 1.0, None).await;

        let service = TaskClaimService::new(store.clone());
        assert!(service.claim().await.unwrap().is_none());
        // The identifier is permanently gone from the priority set.
        assert!(!store.is_queued("t-orphan").await);
        assert_eq!(store.queue_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_payload_consumes_claim() {
        let store = Arc::new(InMemoryQueueStore::new());
        store.enqueue("t-bad", 1.0, Some("not json")).await;

        let service = TaskClaimService::new(store.clone());
        assert!(service.claim().await.unwrap().is_none());
        assert!(!store.is_queued("t-bad").await);
        assert!(!store.payload_exists("t-bad").await);
    }
}
