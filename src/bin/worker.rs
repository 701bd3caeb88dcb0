//! # Face Swap Worker
//!
//! Thin wrapper binary for running the queue consumer as a standalone
//! process. This is the production deployment target.
//!
//! ## Usage
//!
//! ```bash
//! # All required credentials come from the environment
//! UPSTASH_REDIS_REST_URL=... UPSTASH_REDIS_REST_TOKEN=... \
//! WORKER_API_KEY=... R2_ENDPOINT=... R2_ACCESS_KEY=... \
//! R2_SECRET_KEY=... R2_BUCKET=... cargo run --bin faceswap-worker
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use faceswap_worker::config::WorkerConfig;
use faceswap_worker::consumer::ConsumerCore;
use faceswap_worker::listener::{ListenerConfig, NotificationListener};
use faceswap_worker::logging;
use faceswap_worker::pipeline::{PipelineOrchestrator, SwapEngine};
use faceswap_worker::queue::{QueueStore, TaskClaimService, UpstashQueueStore};
use faceswap_worker::shutdown::ShutdownCoordinator;
use faceswap_worker::status::{HttpStatusReporter, StatusSink};
use faceswap_worker::storage::ArtifactStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    info!("🚀 Starting face swap queue worker");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env().context("configuration")?;
    config
        .ensure_directories()
        .context("working directories")?;

    let store: Arc<UpstashQueueStore> =
        Arc::new(UpstashQueueStore::new(&config.queue).context("queue store client")?);

    // Fail fast before entering the loop.
    store
        .ping()
        .await
        .context("queue store connectivity probe")?;
    info!("✅ Connected to queue store");

    let status: Arc<dyn StatusSink> =
        Arc::new(HttpStatusReporter::new(&config.status_api).context("status reporter")?);
    let storage = ArtifactStorage::from_config(&config.storage).context("artifact storage")?;
    let engine = SwapEngine::new(config.engine.clone());

    let coordinator = ShutdownCoordinator::install();
    let shutdown = coordinator.token();

    let orchestrator = PipelineOrchestrator::new(
        storage,
        status,
        engine,
        shutdown.clone(),
        config.download_dir.clone(),
        config.output_dir.clone(),
    );

    let store: Arc<dyn QueueStore> = store;
    let consumer = ConsumerCore::new(
        TaskClaimService::new(store.clone()),
        orchestrator,
        store,
    );

    let listener = NotificationListener::new(
        ListenerConfig::from_queue(&config.queue, config.reconnect_delay),
        shutdown,
    )?;

    listener.run(&consumer).await?;

    info!(
        "👋 Worker stopped, total tasks processed: {}",
        consumer.processed_count()
    );
    Ok(())
}
