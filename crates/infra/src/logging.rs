//! Tracing subscriber setup

use std::fs::File;
use std::path::PathBuf;

use cmdbsync_domain::{Result, SyncError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::infra;

pub use cmdbsync_core::LogLevel;

pub const LOG_FILE_NAME: &str = "cmdb-sync.log";

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub log_dir: PathBuf,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl LogSettings {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into(), default_filter: "info".into() }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }
}

/// Install the console and file layers.
///
/// The log file is truncated so it only holds the current run. Keep the
/// returned guard alive until the process exits or buffered lines are lost.
pub fn init_logging(settings: &LogSettings) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.log_dir).map_err(infra)?;
    let file = File::create(settings.log_file()).map_err(infra)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.default_filter))
        .map_err(|err| SyncError::Config(format!("invalid log filter: {err}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|err| SyncError::Internal(format!("logging already initialised: {err}")))?;

    Ok(guard)
}
