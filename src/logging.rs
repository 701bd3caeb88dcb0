//! # Structured Logging
//!
//! Console tracing initialization. The level is driven by `RUST_LOG` with
//! an `info` default so operational logs are visible out of the box.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console tracing. Safe to call more than once.
pub fn init_tracing() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // Ignore the error if a subscriber is already installed (tests).
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_filter(filter),
            )
            .try_init();
    });
}
