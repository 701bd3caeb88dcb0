//! # Shutdown Coordination
//!
//! Cooperative cancellation for the consumer. The coordinator is built once
//! at process start, owns signal handling, and hands out cloneable tokens
//! that the listener, claim loop, and pipeline read at their checkpoints.
//! Cancellation is never preemptive: in-flight steps finish, subsequent
//! checkpoints are skipped.
//!
//! First SIGINT/SIGTERM requests cooperative shutdown; a second signal
//! terminates the process immediately with a non-zero exit code.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Cloneable cancellation token observed at pipeline and loop checkpoints
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Checkpoint read: has shutdown been requested?
    pub fn requested(&self) -> bool {
        *self.sender.borrow()
    }

    /// Request cooperative shutdown, waking every waiter.
    pub fn request(&self) {
        self.sender.send_replace(true);
    }

    /// Resolve once shutdown is requested. Resolves immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // wait_for checks the current value first, so there is no race
        // between request() and subscribing.
        let _ = receiver.wait_for(|requested| *requested).await;
    }

    /// Sleep that returns early when shutdown is requested.
    pub async fn sleep(&self, duration: std::time::Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancelled() => {}
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns termination-signal handling for the process
pub struct ShutdownCoordinator {
    token: ShutdownToken,
}

impl ShutdownCoordinator {
    /// Install SIGINT/SIGTERM handlers and return the coordinator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install() -> Self {
        let token = ShutdownToken::new();
        let observed = token.clone();

        tokio::spawn(async move {
            loop {
                wait_for_termination_signal().await;

                if observed.requested() {
                    error!("🛑 Second shutdown signal received, terminating immediately");
                    std::process::exit(1);
                }

                info!("⏹️  Shutdown requested, finishing current work (signal again to force exit)");
                observed.request();
            }
        });

        Self { token }
    }

    pub fn token(&self) -> ShutdownToken {
        self.token.clone()
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_termination_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn token_starts_unrequested() {
        let token = ShutdownToken::new();
        assert!(!token.requested());
    }

    #[tokio::test]
    async fn request_is_visible_to_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        token.request();
        assert!(clone.requested());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_request() {
        let token = ShutdownToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        token.request();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled() did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_requested() {
        let token = ShutdownToken::new();
        token.request();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled() should resolve without waiting");
    }

    #[tokio::test]
    async fn sleep_returns_early_on_request() {
        let token = ShutdownToken::new();
        token.request();
        // Would otherwise park for a minute.
        tokio::time::timeout(Duration::from_secs(1), token.sleep(Duration::from_secs(60)))
            .await
            .expect("sleep should return early once shutdown is requested");
    }
}
