//! File logging.
//!
//! Console output goes through the `info!`/`success!`/`warning!`/`error!`
//! macros. Everything that is useful after the fact (per-file outcomes,
//! retries, album creation) is written as `tracing` events to
//! `<state_dir>/upload.log`. `RUST_LOG` overrides the default `info` filter.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing_subscriber::EnvFilter;

use crate::error::LoggingError;

pub const LOG_FILE: &str = "upload.log";

const DEFAULT_FILTER: &str = "info";

/// Appends log events to `path`, creating the file and its parent directory.
pub fn init(path: &Path) -> Result<(), LoggingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::File {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE)
}
