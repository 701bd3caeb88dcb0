#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Face Swap Queue Worker
//!
//! The consumption side of the face-swap job pipeline: claims
//! priority-ordered tasks from a shared queue store, drives each through
//! acquire → compute → publish → report, and records terminal status in
//! the external system of record.
//!
//! ## Architecture
//!
//! One logical worker per process. The [`listener::NotificationListener`]
//! holds a streaming connection to the notification channel and wakes the
//! [`consumer::ConsumerCore`] on each enqueued-task event; the consumer
//! claims atomically through the [`queue`] layer and hands the task to the
//! [`pipeline::PipelineOrchestrator`]. Fleet scale-out is horizontal:
//! every process claims independently, and the atomic claim primitive
//! keeps claimants disjoint.
//!
//! Shutdown is cooperative. A [`shutdown::ShutdownCoordinator`] owns the
//! signal handlers and hands a token to every component; checkpoints skip
//! remaining work, in-flight steps are never interrupted, and a second
//! signal forces immediate termination. A task abandoned between a claim
//! and a terminal status stays `PROCESSING` upstream; fast shutdown is
//! deliberately preferred over finishing near-done work.
//!
//! ## Module Organization
//!
//! - [`listener`] - streaming connection manager for task notifications
//! - [`queue`] - queue store providers and the claim service
//! - [`pipeline`] - per-task orchestration and the swap engine invocation
//! - [`status`] - best-effort reporting to the status API
//! - [`storage`] - object-store input acquisition and artifact publication
//! - [`shutdown`] - cooperative cancellation
//! - [`config`] - environment-sourced configuration
//! - [`error`] - structured error handling

pub mod config;
pub mod constants;
pub mod consumer;
pub mod error;
pub mod events;
pub mod listener;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod shutdown;
pub mod status;
pub mod storage;
pub mod task;
pub mod test_helpers;

pub use config::WorkerConfig;
pub use consumer::ConsumerCore;
pub use error::{Result, WorkerError};
pub use listener::{NotificationHandler, NotificationListener};
pub use pipeline::{PipelineOrchestrator, SwapEngine};
pub use queue::{InMemoryQueueStore, QueueStore, TaskClaimService, UpstashQueueStore};
pub use shutdown::{ShutdownCoordinator, ShutdownToken};
pub use status::{HttpStatusReporter, StatusSink};
pub use storage::ArtifactStorage;
pub use task::{ClaimedTask, TaskPayload, TaskStatus};
