//! Error types shared across the uploader.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while scanning the media root.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid root directory {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the durable stores. All of them are fatal for a run.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} exists but cannot be parsed: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors reported by an [`crate::photos::UploadClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Photos API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Failed to read media file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Rejected(String),
}

impl ClientError {
    /// Whether a repeat of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Api { status, .. } => *status == 429 || *status >= 500,
            ClientError::RateLimited { .. } => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("No access token found. Set GPHOTOS_ACCESS_TOKEN or provide {0}")]
    Missing(PathBuf),

    #[error("Access token in {0} cannot be parsed: {1}")]
    Invalid(PathBuf, String),

    #[error("Access token expired, provide a fresh token")]
    Expired,
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialised: {0}")]
    Init(String),
}
