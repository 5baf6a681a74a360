use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,murshid_core=debug,murshid=debug";

/// `<data_dir>/murshid/logs`, or `./logs` when there is no data directory
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("murshid").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Send all logs to a daily file; the terminal belongs to the UI.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init() -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let dir = log_dir();
    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow!("Could not create log directory {:?}: {}", dir, e))?;

    let file_appender = tracing_appender::rolling::daily(&dir, "murshid.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(non_blocking_file);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();

    Ok(guard)
}
