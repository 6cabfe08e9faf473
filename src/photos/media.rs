use std::time::Duration;

use reqwest::{
    Body,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use tokio_util::io::ReaderStream;

use crate::{
    error::ClientError,
    photos::{GooglePhotosClient, check},
    types::{BatchCreateRequest, BatchCreateResponse, MediaFile, NewMediaItem, SimpleMediaItem},
};

/// Large videos need far longer than the client default.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(360);

/// Streams the file to `/uploads` and returns the upload token.
///
/// The file is reopened for every attempt so a retried upload always starts
/// from the first byte.
pub(super) async fn upload_bytes(
    client: &GooglePhotosClient,
    file: &MediaFile,
) -> Result<String, ClientError> {
    let url = client.endpoint("uploads");
    let url = url.as_str();
    let header_name = header_safe_name(&file.name);
    let header_name = header_name.as_str();

    client
        .with_retry("upload", || async move {
            let handle = tokio::fs::File::open(&file.path).await?;
            let body = Body::wrap_stream(ReaderStream::new(handle));

            let response = client
                .http
                .post(url)
                .bearer_auth(&client.access_token)
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_LENGTH, file.size_bytes)
                .header("X-Goog-Upload-File-Name", header_name)
                .header("X-Goog-Upload-Protocol", "raw")
                .timeout(UPLOAD_TIMEOUT)
                .body(body)
                .send()
                .await?;

            let upload_token = check(response).await?.text().await?;
            if upload_token.trim().is_empty() {
                return Err(ClientError::InvalidResponse(
                    "upload returned an empty token".to_string(),
                ));
            }
            Ok(upload_token)
        })
        .await
}

/// Creates a media item from an upload token inside `album_id`.
pub(super) async fn batch_create(
    client: &GooglePhotosClient,
    upload_token: &str,
    album_id: &str,
    description: &str,
) -> Result<(), ClientError> {
    let url = client.endpoint("mediaItems:batchCreate");
    let url = url.as_str();
    let request = BatchCreateRequest {
        album_id: album_id.to_string(),
        new_media_items: vec![NewMediaItem {
            description: description.to_string(),
            simple_media_item: SimpleMediaItem {
                upload_token: upload_token.to_string(),
            },
        }],
    };
    let request = &request;

    client
        .with_retry("add_to_album", || async move {
            let response = client
                .http
                .post(url)
                .bearer_auth(&client.access_token)
                .json(request)
                .send()
                .await?;

            let body: BatchCreateResponse = check(response).await?.json().await?;
            let Some(result) = body.new_media_item_results.first() else {
                return Err(ClientError::InvalidResponse(
                    "batchCreate returned no media item result".to_string(),
                ));
            };

            match &result.status {
                Some(status) if status.code != 0 => Err(ClientError::Rejected(format!(
                    "media item rejected (code {}): {}",
                    status.code, status.message
                ))),
                _ => Ok(()),
            }
        })
        .await
}

/// Header values must be visible ASCII; other characters become `_`.
fn header_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
