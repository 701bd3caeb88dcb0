//! # Worker Configuration
//!
//! Environment-sourced configuration for the consumer process. The surface
//! is deliberately environment-only: the worker runs as a twelve-factor
//! process next to the compute engine checkout.
//!
//! Every required value missing or empty is a fatal
//! [`WorkerError::Configuration`] at startup, before the consumer loop
//! begins.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{self, env_vars};
use crate::error::{Result, WorkerError};

/// Queue store connection and naming
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// REST endpoint of the queue store
    pub rest_url: String,
    pub rest_token: String,
    /// Priority set name
    pub queue_name: String,
    /// Payload hash key, derived as `{queue_name}:data`
    pub data_key: String,
    /// Notification channel the consumer subscribes to
    pub notification_channel: String,
}

impl QueueConfig {
    /// Subscription endpoint for the notification stream.
    pub fn subscribe_url(&self) -> String {
        format!(
            "{}/subscribe/{}",
            self.rest_url.trim_end_matches('/'),
            self.notification_channel
        )
    }
}

/// Status API connection
#[derive(Debug, Clone)]
pub struct StatusApiConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Object store holding task inputs and published artifacts
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Public base URL for artifact references; presigned URLs are the
    /// fallback when unset
    pub public_url: Option<String>,
}

/// External swap engine invocation
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interpreter binary
    pub python_bin: String,
    /// Engine entrypoint, relative to `engine_dir`
    pub entrypoint: String,
    /// Working directory of the engine checkout
    pub engine_dir: PathBuf,
    /// Hard wall-clock limit per invocation
    pub timeout: Duration,
}

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue: QueueConfig,
    pub status_api: StatusApiConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    /// Local directory for acquired input images
    pub download_dir: PathBuf,
    /// Local directory for engine outputs (retained for diagnostics)
    pub output_dir: PathBuf,
    /// Delay between notification stream reconnect attempts
    pub reconnect_delay: Duration,
}

impl WorkerConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let queue_name = optional(env_vars::QUEUE_NAME, constants::DEFAULT_QUEUE_NAME);
        let data_key = format!("{queue_name}{}", constants::DATA_KEY_SUFFIX);

        let config = Self {
            queue: QueueConfig {
                rest_url: required(env_vars::QUEUE_REST_URL)?,
                rest_token: required(env_vars::QUEUE_REST_TOKEN)?,
                queue_name,
                data_key,
                notification_channel: optional(
                    env_vars::NOTIFICATION_CHANNEL,
                    constants::DEFAULT_NOTIFICATION_CHANNEL,
                ),
            },
            status_api: StatusApiConfig {
                base_url: optional(env_vars::API_BASE_URL, constants::DEFAULT_API_BASE_URL),
                api_key: required(env_vars::WORKER_API_KEY)?,
            },
            storage: StorageConfig {
                endpoint: required(env_vars::STORAGE_ENDPOINT)?,
                access_key: required(env_vars::STORAGE_ACCESS_KEY)?,
                secret_key: required(env_vars::STORAGE_SECRET_KEY)?,
                bucket: required(env_vars::STORAGE_BUCKET)?,
                public_url: non_empty(env_vars::STORAGE_PUBLIC_URL),
            },
            engine: EngineConfig {
                python_bin: optional(env_vars::SWAP_PYTHON, constants::DEFAULT_SWAP_PYTHON),
                entrypoint: optional(
                    env_vars::SWAP_ENTRYPOINT,
                    constants::DEFAULT_SWAP_ENTRYPOINT,
                ),
                engine_dir: PathBuf::from(optional(env_vars::SWAP_ENGINE_DIR, ".")),
                timeout: Duration::from_secs(parsed_secs(
                    env_vars::SWAP_TIMEOUT_SECS,
                    constants::DEFAULT_SWAP_TIMEOUT_SECS,
                )?),
            },
            download_dir: PathBuf::from(optional(
                env_vars::DOWNLOAD_DIR,
                constants::DEFAULT_DOWNLOAD_DIR,
            )),
            output_dir: PathBuf::from(optional(
                env_vars::OUTPUT_DIR,
                constants::DEFAULT_OUTPUT_DIR,
            )),
            reconnect_delay: Duration::from_secs(parsed_secs(
                env_vars::RECONNECT_DELAY_SECS,
                constants::DEFAULT_RECONNECT_DELAY_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !self.queue.rest_url.starts_with("http") {
            return Err(WorkerError::configuration(format!(
                "{} must be an HTTP(S) URL",
                env_vars::QUEUE_REST_URL
            )));
        }
        if self.engine.timeout.is_zero() {
            return Err(WorkerError::configuration(format!(
                "{} must be greater than zero",
                env_vars::SWAP_TIMEOUT_SECS
            )));
        }
        Ok(())
    }

    /// Create the local working directories if they do not exist.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.download_dir, &self.output_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                WorkerError::configuration(format!(
                    "cannot create directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(())
    }
}

fn required(name: &str) -> Result<String> {
    non_empty(name).ok_or_else(|| WorkerError::configuration(format!("{name} must be set")))
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn optional(name: &str, default: &str) -> String {
    non_empty(name).unwrap_or_else(|| default.to_string())
}

fn parsed_secs(name: &str, default: u64) -> Result<u64> {
    match non_empty(name) {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|e| {
            WorkerError::configuration(format!("{name} must be an integer number of seconds: {e}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_env() {
        env::set_var(env_vars::QUEUE_REST_URL, "https://queue.example.com");
        env::set_var(env_vars::QUEUE_REST_TOKEN, "queue-token");
        env::set_var(env_vars::WORKER_API_KEY, "worker-key");
        env::set_var(env_vars::STORAGE_ENDPOINT, "https://storage.example.com");
        env::set_var(env_vars::STORAGE_ACCESS_KEY, "ak");
        env::set_var(env_vars::STORAGE_SECRET_KEY, "sk");
        env::set_var(env_vars::STORAGE_BUCKET, "artifacts");
    }

    fn clear_env() {
        for name in [
            env_vars::QUEUE_REST_URL,
            env_vars::QUEUE_REST_TOKEN,
            env_vars::QUEUE_NAME,
            env_vars::NOTIFICATION_CHANNEL,
            env_vars::API_BASE_URL,
            env_vars::WORKER_API_KEY,
            env_vars::STORAGE_ENDPOINT,
            env_vars::STORAGE_ACCESS_KEY,
            env_vars::STORAGE_SECRET_KEY,
            env_vars::STORAGE_BUCKET,
            env_vars::STORAGE_PUBLIC_URL,
            env_vars::SWAP_TIMEOUT_SECS,
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn from_env_with_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required_env();

        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.queue.queue_name, "priority_queue");
        assert_eq!(config.queue.data_key, "priority_queue:data");
        assert_eq!(
            config.queue.subscribe_url(),
            "https://queue.example.com/subscribe/task_notifications"
        );
        assert_eq!(config.engine.timeout, Duration::from_secs(300));
        assert!(config.storage.public_url.is_none());

        clear_env();
    }

    #[test]
    fn missing_credential_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required_env();
        env::remove_var(env_vars::WORKER_API_KEY);

        let err = WorkerConfig::from_env().unwrap_err();
        assert!(matches!(err, WorkerError::Configuration { .. }));
        assert!(err.to_string().contains("WORKER_API_KEY"));

        clear_env();
    }

    #[test]
    fn empty_credential_counts_as_missing() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required_env();
        env::set_var(env_vars::QUEUE_REST_TOKEN, "");

        assert!(WorkerConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required_env();
        env::set_var(env_vars::SWAP_TIMEOUT_SECS, "soon");

        assert!(WorkerConfig::from_env().is_err());

        env::set_var(env_vars::SWAP_TIMEOUT_SECS, "0");
        assert!(WorkerConfig::from_env().is_err());

        clear_env();
    }
}
