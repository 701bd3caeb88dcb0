//! # Status Reporting
//!
//! Best-effort push of task lifecycle transitions to the external status
//! API. A report never raises past its own boundary: any non-success
//! response or transport error is logged and returned as `false`, which
//! callers treat as "unknown downstream state", never as a reason to alter
//! the local pipeline outcome.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::StatusApiConfig;
use crate::constants::STATUS_REPORT_TIMEOUT_SECS;
use crate::error::{Result, WorkerError};
use crate::task::TaskStatus;

/// Sink for task lifecycle transitions
#[async_trait]
pub trait StatusSink: Send + Sync + 'static {
    /// Report a transition. `true` only when the system of record
    /// confirmed it.
    async fn report(
        &self,
        task_id: &str,
        status: TaskStatus,
        result_path: Option<&str>,
    ) -> bool;
}

/// JSON body of a status update call.
fn status_body(status: TaskStatus, result_path: Option<&str>) -> Value {
    let mut body = json!({ "status": status });
    if let Some(path) = result_path {
        body["resultImagePath"] = Value::String(path.to_string());
    }
    body
}

/// HTTP reporter against the status API
pub struct HttpStatusReporter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpStatusReporter {
    pub fn new(config: &StatusApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(STATUS_REPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| WorkerError::configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn status_url(&self, task_id: &str) -> String {
        format!("{}/api/tasks/{task_id}/status", self.base_url)
    }
}

#[async_trait]
impl StatusSink for HttpStatusReporter {
    async fn report(
        &self,
        task_id: &str,
        status: TaskStatus,
        result_path: Option<&str>,
    ) -> bool {
        let url = self.status_url(task_id);
        let body = status_body(status, result_path);

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                info!(task_id, %status, "✅ Task status updated");
                true
            }
            Ok(response) => {
                let code = response.status();
                let detail = response.text().await.unwrap_or_default();
                warn!(task_id, %status, %code, detail = %detail, "❌ Status update rejected");
                false
            }
            Err(e) => {
                warn!(task_id, %status, error = %e, "❌ Status update failed");
                false
            }
        }
    }
}
