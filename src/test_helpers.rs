//! # Test Helpers
//!
//! Shared doubles and builders for unit and integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::status::StatusSink;
use crate::task::TaskStatus;

/// One recorded status report
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReport {
    pub task_id: String,
    pub status: TaskStatus,
    pub result_path: Option<String>,
}

/// Status sink that records every report
///
/// `reject_reports` flips the returned bool; the pipeline must behave the
/// same either way.
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    reports: RwLock<Vec<RecordedReport>>,
    reject: AtomicBool,
}

impl RecordingStatusSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent reports return `false`.
    pub fn reject_reports(&self) {
        self.reject.store(true, Ordering::Relaxed);
    }

    pub fn reports(&self) -> Vec<RecordedReport> {
        self.reports.read().unwrap().clone()
    }

    /// Statuses reported for one task, in order.
    pub fn statuses_for(&self, task_id: &str) -> Vec<TaskStatus> {
        self.reports
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.task_id == task_id)
            .map(|r| r.status)
            .collect()
    }
}

#[async_trait]
impl StatusSink for RecordingStatusSink {
    async fn report(
        &self,
        task_id: &str,
        status: TaskStatus,
        result_path: Option<&str>,
    ) -> bool {
        self.reports.write().unwrap().push(RecordedReport {
            task_id: task_id.to_string(),
            status,
            result_path: result_path.map(str::to_string),
        });
        !self.reject.load(Ordering::Relaxed)
    }
}

/// Task payload JSON the way the producer writes it.
pub fn payload_json(swap: &str, target: &str, user_id: Option<&str>) -> String {
    let mut payload = serde_json::json!({
        "swapImage": swap,
        "targetImage": target,
        "action": "faceswap",
    });
    if let Some(user_id) = user_id {
        payload["userId"] = serde_json::Value::String(user_id.to_string());
    }
    payload.to_string()
}

/// Write an executable shell script and return its path.
#[cfg(unix)]
pub fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join(name);
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}
