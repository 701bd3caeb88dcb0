//! In-memory queue store for tests and development.
//!
//! Implements the same claim semantics as the REST-protocol store: the pop
//! and the payload removal happen under one write lock, so concurrent
//! claimants always receive disjoint identifiers. Equal scores are broken
//! by lexical member order, matching the native store behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{QueueStore, RawClaim};
use crate::error::Result;

#[derive(Debug, Default)]
struct QueueState {
    /// member -> score
    scores: HashMap<String, f64>,
    /// member -> payload JSON
    payloads: HashMap<String, String>,
}

/// In-memory queue store
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    state: RwLock<QueueState>,
    total_claimed: AtomicU64,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task: one priority-set entry plus, when given, one payload
    /// hash entry. `None` simulates an orphaned identifier.
    pub async fn enqueue(&self, id: &str, priority: f64, payload: Option<&str>) {
        let mut state = self.state.write().await;
        state.scores.insert(id.to_string(), priority);
        if let Some(payload) = payload {
            state.payloads.insert(id.to_string(), payload.to_string());
        }
    }

    /// Whether a payload hash entry exists for the identifier.
    pub async fn payload_exists(&self, id: &str) -> bool {
        self.state.read().await.payloads.contains_key(id)
    }

    /// Whether the identifier is still in the priority set.
    pub async fn is_queued(&self, id: &str) -> bool {
        self.state.read().await.scores.contains_key(id)
    }

    pub fn total_claimed(&self) -> u64 {
        self.total_claimed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn claim_lowest(&self) -> Result<Option<RawClaim>> {
        let mut state = self.state.write().await;

        // Lowest score first, lexical member order on ties.
        let lowest = state
            .scores
            .iter()
            .min_by(|(a_id, a_score), (b_id, b_score)| {
                a_score
                    .partial_cmp(b_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a_id.cmp(b_id))
            })
            .map(|(id, score)| (id.clone(), *score));

        let Some((id, priority)) = lowest else {
            return Ok(None);
        };

        state.scores.remove(&id);
        let payload = state.payloads.remove(&id);
        self.total_claimed.fetch_add(1, Ordering::Relaxed);

        Ok(Some(RawClaim {
            id,
            priority,
            payload,
        }))
    }

    async fn queue_len(&self) -> Result<u64> {
        Ok(self.state.read().await.scores.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
