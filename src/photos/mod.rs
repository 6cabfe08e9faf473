//! # Photos Integration Module
//!
//! This module is the boundary between the upload orchestrator and the remote
//! photo library. The orchestrator only ever talks to the [`UploadClient`]
//! trait and only looks at success or failure plus a human-readable reason;
//! everything about HTTP, authentication headers and retries stays in here.
//!
//! ## Architecture
//!
//! ```text
//! RetryOrchestrator / ListenerLoop
//!          ↓
//!     UploadClient (trait)
//!          ↓
//! GooglePhotosClient
//!     ├── media  (raw byte upload, mediaItems:batchCreate)
//!     └── albums (lookup of app-created albums, album creation)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Photos Library API
//! ```
//!
//! ## Retry Behaviour
//!
//! Transient failures (connection errors, timeouts, `429 Too Many Requests`
//! and `5xx` responses) are retried up to [`DEFAULT_MAX_ATTEMPTS`] times with
//! a fixed [`DEFAULT_RETRY_WAIT`] between attempts. A `Retry-After` header of
//! at most two minutes replaces the fixed wait. Everything else is returned
//! to the caller immediately and ends up in the failure log.
//!
//! ## API Coverage
//!
//! - `POST /uploads` - raw byte upload returning an upload token
//! - `POST /mediaItems:batchCreate` - turns an upload token into a media item in an album
//! - `GET /albums` - app-created albums, used to reuse an album with the same title
//! - `POST /albums` - album creation

mod albums;
mod media;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio::time::sleep;

use crate::{error::ClientError, types::MediaFile};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(5);

/// Longest `Retry-After` the client is willing to sleep through.
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Remote operations the orchestrator depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadClient: Send + Sync {
    /// Transfers the file's bytes and returns the media token for it.
    async fn upload(&self, file: &MediaFile) -> Result<String, ClientError>;

    /// Returns the id of an album titled `album_name`, creating it if needed.
    async fn create_album_if_absent(&self, album_name: &str) -> Result<String, ClientError>;

    /// Attaches an uploaded media token to an album.
    async fn add_to_album(
        &self,
        media_id: &str,
        album_id: &str,
        description: &str,
    ) -> Result<(), ClientError>;
}

/// [`UploadClient`] backed by the Google Photos Library API.
pub struct GooglePhotosClient {
    http: Client,
    api_url: String,
    access_token: String,
    max_attempts: u32,
    retry_wait: Duration,
}

impl GooglePhotosClient {
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
            access_token: access_token.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_wait: DEFAULT_RETRY_WAIT,
        }
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, retry_wait: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_wait = retry_wait;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let wait = match &e {
                        ClientError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(*retry_after_secs).max(self.retry_wait)
                        }
                        _ => self.retry_wait,
                    };
                    tracing::warn!(operation, attempt, "transient error, retrying in {:?}: {}", wait, e);
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl UploadClient for GooglePhotosClient {
    async fn upload(&self, file: &MediaFile) -> Result<String, ClientError> {
        media::upload_bytes(self, file).await
    }

    async fn create_album_if_absent(&self, album_name: &str) -> Result<String, ClientError> {
        albums::create_album_if_absent(self, album_name).await
    }

    async fn add_to_album(
        &self,
        media_id: &str,
        album_id: &str,
        description: &str,
    ) -> Result<(), ClientError> {
        media::batch_create(self, media_id, album_id, description).await
    }
}

/// Turns a non-success response into a [`ClientError`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(retry_after_secs) = retry_after {
            if retry_after_secs <= MAX_RETRY_AFTER_SECS {
                return Err(ClientError::RateLimited { retry_after_secs });
            }
        }
    }

    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
