//! Structured logging infrastructure for Nimbus.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level. Calling this more than once is a
/// no-op.
///
/// # Example
/// ```no_run
/// use nimbus_core::logging;
///
/// logging::init();
/// tracing::info!("Pipeline started");
/// ```
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// This format is suitable for log aggregation systems and structured log analysis.
///
/// # Example
/// ```no_run
/// use nimbus_core::logging;
///
/// logging::init_json();
/// tracing::info!(records = 3, "Attestation archive opened");
/// ```
pub fn init_json() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .try_init();
}

/// Initialize logging from the `[logging]` configuration section.
///
/// `RUST_LOG` still takes precedence over the configured filter.
pub fn init_from_config(config: &LoggingConfig) {
    let filter = env_filter(&config.filter);
    let registry = tracing_subscriber::registry().with(filter);

    let _ = if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
    };
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}
