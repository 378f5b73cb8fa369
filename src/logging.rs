//! File logging through tracing
//!
//! The terminal belongs to the menu, so log records go to
//! `<data_dir>/cursor-installer.log` via a non-blocking appender.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{APP_NAME, Config, data_dir};

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("{}={level}", APP_NAME.replace('-', "_"))
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered records are flushed.
pub fn init(config: &Config) -> anyhow::Result<WorkerGuard> {
    init_in(&data_dir(), config)
}

fn init_in(dir: &Path, config: &Config) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, format!("{APP_NAME}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
