//! # Pipeline Orchestrator
//!
//! Drives one claimed task through acquire → compute → publish → report,
//! checking the shutdown token before each step and guaranteeing local
//! input cleanup on every exit path.
//!
//! Outcome contract:
//! - all steps complete → artifact published, `DONE` reported with the
//!   storage-relative path, `Some(PublishedArtifact)` returned;
//! - any step fails → `FAILED` reported best-effort, `None` returned;
//! - shutdown observed at a checkpoint → no further steps, no terminal
//!   report, `None` returned (the task is abandoned; see the shutdown
//!   notes in the crate docs).
//!
//! The produced output file is intentionally left on local disk for
//! diagnostics; only acquired inputs are deleted.

pub mod engine;

pub use engine::SwapEngine;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::constants::ARTIFACT_CONTENT_TYPE;
use crate::error::{Result, WorkerError};
use crate::shutdown::ShutdownToken;
use crate::status::StatusSink;
use crate::storage::{artifact_key, ArtifactStorage};
use crate::task::{ClaimedTask, TaskStatus};

/// A published artifact and its references
#[derive(Debug, Clone)]
pub struct PublishedArtifact {
    /// Durable reference: public URL or presigned URL
    pub url: String,
    /// Storage-relative path recorded with the `DONE` report
    pub storage_path: String,
    /// Local output file, retained on disk
    pub local_output: PathBuf,
}

/// Local input files created for one pipeline run
///
/// Tracked before each fetch so a partially-written file is still removed.
#[derive(Debug, Default)]
struct TempInputs {
    files: Vec<PathBuf>,
}

impl TempInputs {
    fn track(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    /// Delete every tracked file that exists, tolerating individual
    /// failures.
    async fn cleanup(&mut self) {
        for path in self.files.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(path = %path.display(), "Cleaned up input file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to clean up input file"),
            }
        }
    }
}

/// Sequences the processing pipeline for claimed tasks
pub struct PipelineOrchestrator {
    storage: ArtifactStorage,
    status: Arc<dyn StatusSink>,
    engine: SwapEngine,
    shutdown: ShutdownToken,
    download_dir: PathBuf,
    output_dir: PathBuf,
}

impl PipelineOrchestrator {
    pub fn new(
        storage: ArtifactStorage,
        status: Arc<dyn StatusSink>,
        engine: SwapEngine,
        shutdown: ShutdownToken,
        download_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            status,
            engine,
            shutdown,
            download_dir,
            output_dir,
        }
    }

    /// Run one task to completion, failure, or shutdown-abort.
    pub async fn process(&self, task: &ClaimedTask) -> Option<PublishedArtifact> {
        info!(
            task_id = %task.id,
            priority = task.priority,
            action = task.payload.action.as_deref().unwrap_or("unknown"),
            "Processing task"
        );

        let mut inputs = TempInputs::default();
        let outcome = self.run_steps(task, &mut inputs).await;

        // Unconditional, on every exit path.
        inputs.cleanup().await;

        match outcome {
            Ok(Some(artifact)) => {
                info!(
                    task_id = %task.id,
                    url = %artifact.url,
                    path = %artifact.storage_path,
                    "✅ Task completed"
                );
                Some(artifact)
            }
            Ok(None) => None,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "❌ Task failed");
                self.report(task, TaskStatus::Failed, None).await;
                None
            }
        }
    }

    async fn run_steps(
        &self,
        task: &ClaimedTask,
        inputs: &mut TempInputs,
    ) -> Result<Option<PublishedArtifact>> {
        let unique = unique_suffix();

        if self.aborted(task, "before preparing") {
            return Ok(None);
        }
        self.report(task, TaskStatus::Preparing, None).await;

        let swap_reference = required_reference(task.payload.swap_image.as_deref(), "swapImage")?;
        let swap_local = self.download_dir.join(format!("swap_{unique}.jpg"));
        inputs.track(swap_local.clone());
        self.storage.fetch_to_file(swap_reference, &swap_local).await?;

        if self.aborted(task, "after source acquisition") {
            return Ok(None);
        }

        let target_reference =
            required_reference(task.payload.target_image.as_deref(), "targetImage")?;
        let target_local = self.download_dir.join(format!("target_{unique}.jpg"));
        inputs.track(target_local.clone());
        self.storage
            .fetch_to_file(target_reference, &target_local)
            .await?;

        if self.aborted(task, "before processing") {
            return Ok(None);
        }
        self.report(task, TaskStatus::Processing, None).await;

        let output_local = self
            .output_dir
            .join(format!("output_{}_{unique}.jpeg", task.id));
        self.engine
            .run(&swap_local, &target_local, &output_local)
            .await?;

        if self.aborted(task, "before publication") {
            return Ok(None);
        }

        let key = artifact_key(task.payload.user_id.as_deref(), &task.id);
        let url = self
            .storage
            .publish_file(&output_local, &key, ARTIFACT_CONTENT_TYPE)
            .await?;

        let storage_path = self.storage.storage_relative_path(&url, &key);
        self.report(task, TaskStatus::Done, Some(&storage_path)).await;

        Ok(Some(PublishedArtifact {
            url,
            storage_path,
            local_output: output_local,
        }))
    }

    /// Shutdown checkpoint. In-flight steps are never interrupted; the
    /// pipeline simply stops advancing.
    fn aborted(&self, task: &ClaimedTask, checkpoint: &str) -> bool {
        if self.shutdown.requested() {
            warn!(task_id = %task.id, checkpoint, "⏹️  Shutdown requested, abandoning task");
            true
        } else {
            false
        }
    }

    /// Best-effort status report; an unconfirmed report never changes the
    /// pipeline outcome.
    async fn report(&self, task: &ClaimedTask, status: TaskStatus, result_path: Option<&str>) {
        if !self.status.report(&task.id, status, result_path).await {
            warn!(task_id = %task.id, %status, "Status report not confirmed");
        }
    }
}

fn required_reference<'a>(reference: Option<&'a str>, field: &str) -> Result<&'a str> {
    reference.ok_or_else(|| WorkerError::Acquisition {
        reference: field.to_string(),
        message: "not provided in task payload".to_string(),
    })
}

fn unique_suffix() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_suffix_is_short_and_distinct() {
        let a = unique_suffix();
        let b = unique_suffix();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_reference_is_an_acquisition_error() {
        let err = required_reference(None, "swapImage").unwrap_err();
        match err {
            WorkerError::Acquisition { reference, .. } => assert_eq!(reference, "swapImage"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let existing = tmp.path().join("swap_aaaa.jpg");
        std::fs::write(&existing, b"x").unwrap();

        let mut inputs = TempInputs::default();
        inputs.track(existing.clone());
        inputs.track(tmp.path().join("never_created.jpg"));

        inputs.cleanup().await;
        assert!(!existing.exists());
    }
}
