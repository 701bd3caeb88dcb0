//! # Notification Listener
//!
//! Owns the streaming connection to the notification channel: connect,
//! parse newline-delimited frames, dispatch matching notifications to a
//! handler, and reconnect with a delay on any transport failure.
//!
//! The loop's only exit condition is the shutdown token, checked before
//! each connect attempt and before processing each frame. Malformed
//! frames are logged and skipped; they never terminate the loop.
//!
//! Notifications are a liveness hint, not a queue: the handler re-derives
//! the actual work item by claiming from the queue store, so a
//! notification with no corresponding claimable task is a logged no-op.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, trace, warn};

use crate::config::QueueConfig;
use crate::constants::FRAME_DATA_PREFIX;
use crate::error::{Result, WorkerError};
use crate::events::{parse_data_frame, StreamFrame, TaskNotification};
use crate::shutdown::ShutdownToken;

/// Statistics about the listener
#[derive(Debug, Clone, Default)]
pub struct ListenerStats {
    pub connected: bool,
    pub frames_received: u64,
    pub notifications_received: u64,
    pub parse_errors: u64,
    pub connection_errors: u64,
    pub handler_errors: u64,
}

/// Trait for handling task notifications
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handle one matching notification. Errors are logged by the
    /// listener; they never stop the read loop.
    async fn on_task_ready(&self, notification: TaskNotification) -> Result<()>;
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub subscribe_url: String,
    pub token: String,
    /// Channel whose messages trigger the claim-and-process cycle
    pub channel: String,
    pub reconnect_delay: Duration,
}

impl ListenerConfig {
    pub fn from_queue(queue: &QueueConfig, reconnect_delay: Duration) -> Self {
        Self {
            subscribe_url: queue.subscribe_url(),
            token: queue.rest_token.clone(),
            channel: queue.notification_channel.clone(),
            reconnect_delay,
        }
    }
}

/// Streaming connection manager for task notifications
pub struct NotificationListener {
    client: reqwest::Client,
    config: ListenerConfig,
    shutdown: ShutdownToken,
    stats: Arc<RwLock<ListenerStats>>,
}

impl NotificationListener {
    pub fn new(config: ListenerConfig, shutdown: ShutdownToken) -> Result<Self> {
        // No overall request timeout: the stream is long-lived by design.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WorkerError::configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            shutdown,
            stats: Arc::new(RwLock::new(ListenerStats::default())),
        })
    }

    /// Get listener statistics
    pub fn stats(&self) -> ListenerStats {
        self.stats.read().unwrap().clone()
    }

    fn stats_mut(&self, update: impl FnOnce(&mut ListenerStats)) {
        let mut stats = self.stats.write().unwrap();
        update(&mut stats);
    }

    /// Run the listen loop until shutdown is requested.
    pub async fn run<H: NotificationHandler>(&self, handler: &H) -> Result<()> {
        info!(
            channel = %self.config.channel,
            url = %self.config.subscribe_url,
            "🔔 Starting notification listener"
        );

        while !self.shutdown.requested() {
            if let Err(e) = self.connect_and_read(handler).await {
                self.stats_mut(|s| {
                    s.connected = false;
                    s.connection_errors += 1;
                });
                warn!(error = %e, "⚠️  Notification stream connection lost");
            }

            if self.shutdown.requested() {
                break;
            }

            info!(
                delay_secs = self.config.reconnect_delay.as_secs(),
                "🔄 Reconnecting to notification stream"
            );
            self.shutdown.sleep(self.config.reconnect_delay).await;
        }

        info!("🛑 Notification listener stopped");
        Ok(())
    }

    async fn connect_and_read<H: NotificationHandler>(&self, handler: &H) -> Result<()> {
        let response = self
            .client
            .get(&self.config.subscribe_url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| WorkerError::transport("subscribe", e))?
            .error_for_status()
            .map_err(|e| WorkerError::transport("subscribe", e))?;

        self.stats_mut(|s| s.connected = true);
        info!("✅ Notification stream connected, waiting for tasks");

        let mut stream = Box::pin(response.bytes_stream());
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            // A quiet stream must not delay shutdown: wake on either.
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = self.shutdown.cancelled() => {
                    info!("⏹️  Shutdown requested, closing notification stream");
                    return Ok(());
                }
            };
            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk.map_err(|e| WorkerError::transport("read", e))?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=newline).collect();

                if self.shutdown.requested() {
                    info!("⏹️  Shutdown requested, closing notification stream");
                    return Ok(());
                }

                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
                if line.is_empty() {
                    continue;
                }
                self.handle_line(line, handler).await;
            }
        }

        self.stats_mut(|s| s.connected = false);
        warn!("Notification stream ended by server");
        Ok(())
    }

    async fn handle_line<H: NotificationHandler>(&self, line: &str, handler: &H) {
        let Some(frame) = parse_data_frame(line) else {
            if line.starts_with(FRAME_DATA_PREFIX) {
                self.stats_mut(|s| s.parse_errors += 1);
                warn!(line, "⚠️  Skipping malformed stream frame");
            } else {
                trace!(line, "Ignoring non-data line");
            }
            return;
        };

        self.stats_mut(|s| s.frames_received += 1);

        match frame {
            StreamFrame::SubscribeAck { channel } => {
                info!(channel = %channel, "📡 Subscribed to channel");
            }
            StreamFrame::Message { channel, body } => {
                if channel != self.config.channel {
                    debug!(channel = %channel, "Ignoring message for unrelated channel");
                    return;
                }

                match serde_json::from_str::<TaskNotification>(&body) {
                    Err(e) => {
                        self.stats_mut(|s| s.parse_errors += 1);
                        warn!(error = %e, body = %body, "⚠️  Invalid JSON in notification");
                    }
                    Ok(notification) => {
                        self.stats_mut(|s| s.notifications_received += 1);
                        info!(task_id = %notification.task_id, "📩 Received task notification");

                        if let Err(e) = handler.on_task_ready(notification).await {
                            self.stats_mut(|s| s.handler_errors += 1);
                            warn!(error = %e, "⚠️  Error processing notification");
                        }
                    }
                }
            }
        }
    }
}
