use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::error::StoreError;

/// Reads a store file, returning `None` when it does not exist yet.
pub(crate) async fn read_if_exists(path: &Path) -> Result<Option<String>, StoreError> {
    match async_fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `value` as pretty JSON next to `path`, syncs it and renames it into
/// place, so readers only ever observe the old or the new content.
pub(crate) async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            async_fs::create_dir_all(parent).await.map_err(io_err)?;
        }
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = tmp_path(path);
    async_fs::write(&tmp, json).await.map_err(io_err)?;
    async_fs::OpenOptions::new()
        .write(true)
        .open(&tmp)
        .await
        .map_err(io_err)?
        .sync_all()
        .await
        .map_err(io_err)?;
    async_fs::rename(&tmp, path).await.map_err(io_err)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
