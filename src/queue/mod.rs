//! # Queue Store
//!
//! Provider abstraction over the shared priority queue: a scored set of
//! task identifiers plus a side hash of payloads, keyed identically.
//!
//! The one mutating primitive is [`QueueStore::claim_lowest`], which pops
//! the lowest-scored member and removes and returns its payload in a
//! single atomic step, so two concurrent claimants can never receive the
//! same identifier, and a crash can never leave a popped identifier with
//! an orphaned payload entry.
//!
//! Providers:
//! - [`UpstashQueueStore`] - the REST-protocol store used in production
//! - [`InMemoryQueueStore`] - in-process store for tests and development

mod claim;
mod in_memory;
mod upstash;

pub use claim::TaskClaimService;
pub use in_memory::InMemoryQueueStore;
pub use upstash::UpstashQueueStore;

use async_trait::async_trait;

use crate::error::Result;

/// A claim popped from the priority set, payload still unparsed
///
/// `payload` is `None` when the identifier had no entry in the payload
/// hash; the claim is consumed either way.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClaim {
    pub id: String,
    pub priority: f64,
    pub payload: Option<String>,
}

/// Shared queue store primitives
///
/// Ordering contract: `claim_lowest` serves members in non-decreasing
/// score order; ties at equal score are broken by lexical member order.
#[async_trait]
pub trait QueueStore: Send + Sync + 'static {
    /// Atomically pop the lowest-scored member and take its payload.
    ///
    /// Returns `Ok(None)` when the priority set is empty.
    async fn claim_lowest(&self) -> Result<Option<RawClaim>>;

    /// Cardinality of the priority set.
    async fn queue_len(&self) -> Result<u64>;

    /// Connectivity probe; used at startup before entering the loop.
    async fn ping(&self) -> Result<()>;
}
