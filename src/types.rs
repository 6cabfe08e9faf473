use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// A single media file found inside an album folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    /// Lower-cased extension without the leading dot; empty when absent.
    pub extension: String,
}

impl MediaFile {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path,
            name,
            size_bytes,
            extension,
        }
    }

    pub fn folder(&self) -> Option<&Path> {
        self.path.parent()
    }
}

/// A file the catalog refused, together with the category it is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub category: FailureCategory,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub file: MediaFile,
    pub rejection: Rejection,
}

/// One source folder and the media that will be mirrored into a remote album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumUnit {
    pub name: String,
    pub path: PathBuf,
    pub files: Vec<MediaFile>,
    pub rejected: Vec<RejectedFile>,
}

impl AlbumUnit {
    pub fn len(&self) -> usize {
        self.files.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The closed set of failure classifications persisted in the failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    UploadError,
    AddToAlbumError,
    TooLarge,
    ExifErrors,
    UnsupportedFormat,
}

impl FailureCategory {
    /// Processing order used by retry runs.
    pub const ALL: [FailureCategory; 5] = [
        FailureCategory::UploadError,
        FailureCategory::AddToAlbumError,
        FailureCategory::TooLarge,
        FailureCategory::ExifErrors,
        FailureCategory::UnsupportedFormat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::UploadError => "UploadError",
            FailureCategory::AddToAlbumError => "AddToAlbumError",
            FailureCategory::TooLarge => "TooLarge",
            FailureCategory::ExifErrors => "ExifErrors",
            FailureCategory::UnsupportedFormat => "UnsupportedFormat",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailureCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown failure category '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub album: String,
    pub reason: String,
    pub timestamp: String,
}

impl FailureRecord {
    pub fn new(path: impl Into<PathBuf>, album: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            album: album.into(),
            reason: reason.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Per-album entry of the upload state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumEntry {
    pub album_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, alias = "uploaded_files")]
    pub files: BTreeSet<String>,
    /// Keys written by other tools, carried through load and save untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Tabled)]
pub struct SummaryTableRow {
    pub outcome: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlbumRequest {
    pub album: NewAlbum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlbum {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlbumsResponse {
    #[serde(default)]
    pub albums: Vec<Album>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    pub album_id: String,
    pub new_media_items: Vec<NewMediaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItem {
    pub description: String,
    pub simple_media_item: SimpleMediaItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMediaItem {
    pub upload_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    #[serde(default)]
    pub new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItemResult {
    pub upload_token: Option<String>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}
