//! # Task Model
//!
//! The claimed work item and its lifecycle state machine.
//!
//! A task exists in the queue store as two entries keyed by the same
//! identifier: a member of the priority set (lower score = served first)
//! and a JSON payload in the side hash. Claiming removes both; from then on
//! the claiming process exclusively owns the task until it reaches a
//! terminal status or is abandoned by shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle states reported to the status API
///
/// `Preparing -> Processing -> {Done | Failed}`. The initial state is
/// implicit (the task is unclaimed); terminal states are reported exactly
/// once under normal operation. A mid-pipeline shutdown may abandon a task
/// in `Preparing` or `Processing` (a documented gap, not a transition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Claimed; inputs are being acquired
    Preparing,
    /// Inputs local; the compute step is running
    Processing,
    /// Artifact published and recorded
    Done,
    /// A pipeline step failed
    Failed,
}

impl TaskStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Valid successor states from this state
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Preparing, Self::Processing)
                | (Self::Preparing, Self::Failed)
                | (Self::Processing, Self::Done)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparing => write!(f, "PREPARING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PREPARING" => Ok(Self::Preparing),
            "PROCESSING" => Ok(Self::Processing),
            "DONE" => Ok(Self::Done),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Task payload as written by the producer into the payload hash
///
/// Field names are camelCase on the wire. The image references are
/// validated by the pipeline, not at parse time: a payload missing a
/// reference still claims successfully and then fails acquisition, so the
/// task gets a `FAILED` report instead of silently vanishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    /// Storage reference of the swap (source face) image
    #[serde(default)]
    pub swap_image: Option<String>,
    /// Storage reference of the target image
    #[serde(default)]
    pub target_image: Option<String>,
    /// Owning user; absent for anonymous tasks
    #[serde(default)]
    pub user_id: Option<String>,
    /// Action tag, logging only
    #[serde(default)]
    pub action: Option<String>,
    /// Creation timestamp as written by the producer, logging only
    #[serde(default)]
    pub created_time: Option<serde_json::Value>,
    /// Free-form metadata the producer may attach
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A task claimed from the queue store, exclusively owned by this process
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    pub id: String,
    /// Priority score at claim time; lower value = higher priority
    pub priority: f64,
    pub payload: TaskPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Preparing).unwrap(),
            "\"PREPARING\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Done).unwrap(),
            "\"DONE\""
        );
    }

    #[test]
    fn status_round_trips_from_str() {
        for status in [
            TaskStatus::Preparing,
            TaskStatus::Processing,
            TaskStatus::Done,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_str(&status.to_string()), Ok(status));
        }
        assert!(TaskStatus::from_str("QUEUED").is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskStatus::Preparing.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn lifecycle_transitions() {
        assert!(TaskStatus::Preparing.can_transition_to(TaskStatus::Processing));
        assert!(TaskStatus::Processing.can_transition_to(TaskStatus::Done));
        assert!(TaskStatus::Processing.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Done.can_transition_to(TaskStatus::Processing));
        assert!(!TaskStatus::Preparing.can_transition_to(TaskStatus::Done));
    }

    #[test]
    fn payload_parses_producer_shape() {
        let json = r#"{
            "swapImage": "/uploads/u1/inputs/face.jpg",
            "targetImage": "/uploads/u1/inputs/scene.jpg",
            "userId": "u1",
            "action": "faceswap",
            "createdTime": 1717171717,
            "campaign": "beta"
        }"#;
        let payload: TaskPayload = serde_json::from_str(json).unwrap();
        assert_eq!(
            payload.swap_image.as_deref(),
            Some("/uploads/u1/inputs/face.jpg")
        );
        assert_eq!(payload.user_id.as_deref(), Some("u1"));
        assert_eq!(
            payload.extra.get("campaign"),
            Some(&serde_json::Value::String("beta".to_string()))
        );
    }

    #[test]
    fn payload_tolerates_missing_fields() {
        let payload: TaskPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.swap_image.is_none());
        assert!(payload.target_image.is_none());
        assert!(payload.user_id.is_none());
    }
}
