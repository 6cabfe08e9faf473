use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    error::StoreError,
    management::file,
    types::AlbumEntry,
};

pub const UPLOAD_STATE_FILE: &str = "upload_state.json";

/// Durable record of which files were uploaded into which remote album.
///
/// The dedup key is the album name plus the file name. The in-memory copy is
/// only refreshed by an explicit [`UploadStateStore::reload`].
#[derive(Debug)]
pub struct UploadStateStore {
    path: PathBuf,
    albums: BTreeMap<String, AlbumEntry>,
}

impl UploadStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            albums: BTreeMap::new(),
        }
    }

    /// Loads the state file. A missing file yields an empty state; a file that
    /// exists but cannot be parsed is reported as [`StoreError::Corrupt`].
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self::new(path);
        store.reload().await?;
        Ok(store)
    }

    pub async fn reload(&mut self) -> Result<(), StoreError> {
        self.albums = match file::read_if_exists(&self.path).await? {
            Some(json) => serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?,
            None => BTreeMap::new(),
        };
        Ok(())
    }

    pub async fn save(&self) -> Result<(), StoreError> {
        file::write_json_atomic(&self.path, &self.albums).await
    }

    pub fn is_uploaded(&self, album: &str, file_name: &str) -> bool {
        self.albums
            .get(album)
            .map(|entry| entry.files.contains(file_name))
            .unwrap_or(false)
    }

    /// Remote id of an album created in an earlier run, if any.
    pub fn album_id(&self, album: &str) -> Option<&str> {
        self.albums
            .get(album)
            .map(|entry| entry.album_id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Remembers the remote id of an album. Returns `true` if anything changed.
    pub fn record_album(&mut self, album: &str, album_id: &str, folder: Option<&Path>) -> bool {
        let entry = self.albums.entry(album.to_string()).or_default();
        let mut changed = false;

        if entry.album_id != album_id {
            entry.album_id = album_id.to_string();
            changed = true;
        }
        if entry.path.is_none() {
            if let Some(folder) = folder {
                entry.path = Some(folder.to_path_buf());
                changed = true;
            }
        }

        changed
    }

    /// Marks `file_name` as uploaded into `album`. Calling it again with the
    /// same arguments is a no-op; returns `true` only when the file was new.
    pub fn record_success(&mut self, album: &str, file_name: &str, album_id: &str) -> bool {
        let entry = self.albums.entry(album.to_string()).or_default();
        if entry.album_id.is_empty() {
            entry.album_id = album_id.to_string();
        }
        entry.files.insert(file_name.to_string())
    }

    pub fn album(&self, album: &str) -> Option<&AlbumEntry> {
        self.albums.get(album)
    }

    pub fn count_albums(&self) -> usize {
        self.albums.len()
    }

    pub fn count_files(&self) -> usize {
        self.albums.values().map(|entry| entry.files.len()).sum()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
