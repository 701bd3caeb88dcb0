//! # System Constants
//!
//! Queue names, channel names, frame-grammar literals, and operational
//! defaults for the consumer. Values mirror what the task producer writes
//! into the shared queue store.

/// Priority set the producer enqueues task identifiers into.
pub const DEFAULT_QUEUE_NAME: &str = "priority_queue";

/// Suffix appended to the queue name to form the payload hash key.
pub const DATA_KEY_SUFFIX: &str = ":data";

/// Publish/subscribe channel carrying task-enqueued notifications.
pub const DEFAULT_NOTIFICATION_CHANNEL: &str = "task_notifications";

/// Literal prefix of a data frame on the notification stream.
pub const FRAME_DATA_PREFIX: &str = "data: ";

/// Default base URL of the status API.
pub const DEFAULT_API_BASE_URL: &str = "https://aifacesswap.com";

/// Feature-selection flag passed to the swap engine CLI.
pub const SWAP_FRAME_PROCESSOR: &str = "face_swapper";

/// Key segment used when a task has no owning user.
pub const ANONYMOUS_USER_SEGMENT: &str = "anonymous";

/// Content type of published artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "image/jpeg";

pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

pub const DEFAULT_SWAP_PYTHON: &str = "python";
pub const DEFAULT_SWAP_ENTRYPOINT: &str = "run.py";

/// Hard wall-clock limit on one swap engine invocation.
pub const DEFAULT_SWAP_TIMEOUT_SECS: u64 = 300;

/// Delay between notification stream reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Timeout on each status API call.
pub const STATUS_REPORT_TIMEOUT_SECS: u64 = 10;

/// Lifetime of a presigned artifact URL when no public base is configured.
pub const SIGNED_URL_TTL_SECS: u64 = 86_400;

/// Environment variable names making up the configuration surface
pub mod env_vars {
    pub const QUEUE_REST_URL: &str = "UPSTASH_REDIS_REST_URL";
    pub const QUEUE_REST_TOKEN: &str = "UPSTASH_REDIS_REST_TOKEN";
    pub const QUEUE_NAME: &str = "QUEUE_NAME";
    pub const NOTIFICATION_CHANNEL: &str = "NOTIFICATION_CHANNEL";
    pub const API_BASE_URL: &str = "API_BASE_URL";
    pub const WORKER_API_KEY: &str = "WORKER_API_KEY";
    pub const STORAGE_ENDPOINT: &str = "R2_ENDPOINT";
    pub const STORAGE_ACCESS_KEY: &str = "R2_ACCESS_KEY";
    pub const STORAGE_SECRET_KEY: &str = "R2_SECRET_KEY";
    pub const STORAGE_BUCKET: &str = "R2_BUCKET";
    pub const STORAGE_PUBLIC_URL: &str = "R2_PUBLIC_URL";
    pub const DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
    pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
    pub const SWAP_ENGINE_DIR: &str = "SWAP_ENGINE_DIR";
    pub const SWAP_PYTHON: &str = "SWAP_PYTHON";
    pub const SWAP_ENTRYPOINT: &str = "SWAP_ENTRYPOINT";
    pub const SWAP_TIMEOUT_SECS: &str = "SWAP_TIMEOUT_SECS";
    pub const RECONNECT_DELAY_SECS: &str = "RECONNECT_DELAY_SECS";
}
