//! # Worker Error Types
//!
//! Structured error handling for the queue consumer using thiserror.
//! Each variant maps to one recovery policy: configuration errors are fatal
//! at startup, transport and queue-store errors are retried locally,
//! pipeline errors mark the task FAILED, and data-integrity errors drop the
//! claim without a task-level report.

use thiserror::Error;

/// Errors raised by the worker components
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Transport error during {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("Queue store error: {operation}: {message}")]
    QueueStore { operation: String, message: String },

    #[error("Data integrity error for task {task_id}: {message}")]
    DataIntegrity { task_id: String, message: String },

    #[error("Failed to acquire input '{reference}': {message}")]
    Acquisition { reference: String, message: String },

    #[error("Compute step failed: {message}")]
    Compute { message: String },

    #[error("Compute step timed out after {timeout_seconds}s")]
    ComputeTimeout { timeout_seconds: u64 },

    #[error("Failed to publish artifact: {message}")]
    Publication { message: String },
}

impl WorkerError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn transport<S: Into<String>, E: std::fmt::Display>(operation: S, source: E) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: source.to_string(),
        }
    }

    pub fn queue_store<S: Into<String>, E: std::fmt::Display>(operation: S, source: E) -> Self {
        Self::QueueStore {
            operation: operation.into(),
            message: source.to_string(),
        }
    }

    pub fn data_integrity<S: Into<String>, M: Into<String>>(task_id: S, message: M) -> Self {
        Self::DataIntegrity {
            task_id: task_id.into(),
            message: message.into(),
        }
    }

    pub fn acquisition<S: Into<String>, E: std::fmt::Display>(reference: S, source: E) -> Self {
        Self::Acquisition {
            reference: reference.into(),
            message: source.to_string(),
        }
    }

    pub fn compute<S: Into<String>>(message: S) -> Self {
        Self::Compute {
            message: message.into(),
        }
    }

    pub fn publication<E: std::fmt::Display>(source: E) -> Self {
        Self::Publication {
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
