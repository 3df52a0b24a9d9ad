//! Logging Infrastructure
//!
//! Structured logging setup for the `price-order` binary. The library itself
//! only emits `tracing` events and never installs a subscriber.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

const LOG_FILE_PREFIX: &str = "pricing-engine";

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger from engine configuration
pub fn init_logger_from_config(config: &EngineConfig) {
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
}

/// Initialize the logger with optional JSON format and file output
///
/// A second call is a no-op: the first installed subscriber stays active.
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // File output only when the directory already exists
    let file_dir = log_dir.map(Path::new).filter(|p| p.is_dir());

    let result = match (json.unwrap_or(false), file_dir) {
        (true, Some(dir)) => builder
            .json()
            .with_writer(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
            .try_init(),
        (true, None) => builder.json().try_init(),
        (false, Some(dir)) => builder
            .with_writer(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
            .try_init(),
        (false, None) => builder.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Logger already initialized: {}", e);
    }
}
