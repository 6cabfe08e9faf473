//! Configuration management for the uploader.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. Command-line flags take precedence over
//! anything read here.
//!
//! Lookup order:
//! 1. Command-line flags
//! 2. Environment variables
//! 3. `.env` file in the local data directory
//! 4. Built-in defaults

use std::{env, path::PathBuf, time::Duration};

pub const APP_DIR: &str = "gphotos-uploader";

pub const DEFAULT_API_URL: &str = "https://photoslibrary.googleapis.com/v1";

pub const DEFAULT_LISTENER_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_EXIFTOOL: &str = "exiftool";

/// Loads variables from `<data_local_dir>/gphotos-uploader/.env` when present.
///
/// A missing file is not an error; a file that exists but cannot be parsed is.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/gphotos-uploader/.env`
/// - macOS: `~/Library/Application Support/gphotos-uploader/.env`
/// - Windows: `%LOCALAPPDATA%/gphotos-uploader/.env`
pub async fn load_env() -> Result<(), String> {
    let path = default_app_dir().join(".env");
    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Platform data directory for the uploader.
pub fn default_app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Directory holding the state file, the failure log, the token and the log.
///
/// Reads `GPHOTOS_STATE_DIR`, falling back to [`default_app_dir`].
pub fn state_dir() -> PathBuf {
    env::var("GPHOTOS_STATE_DIR")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_app_dir)
}

/// Base URL of the Photos Library API (`GPHOTOS_API_URL`).
pub fn api_url() -> String {
    env::var("GPHOTOS_API_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Access token supplied directly through `GPHOTOS_ACCESS_TOKEN`.
pub fn access_token() -> Option<String> {
    env::var("GPHOTOS_ACCESS_TOKEN")
        .ok()
        .filter(|v| !v.is_empty())
}

/// Sleep between listener cycles (`GPHOTOS_LISTENER_INTERVAL_SECS`).
pub fn listener_interval() -> Duration {
    let secs = env::var("GPHOTOS_LISTENER_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LISTENER_INTERVAL_SECS);
    Duration::from_secs(secs)
}

/// Path or name of the exiftool binary (`GPHOTOS_EXIFTOOL`).
pub fn exiftool() -> PathBuf {
    env::var("GPHOTOS_EXIFTOOL")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXIFTOOL))
}
