//! Media catalog: turns a root folder into ordered album units.
//!
//! Every direct sub-directory of the root becomes one album, and the regular
//! files directly inside it become its media. Ordering is by file name at both
//! levels so two scans of an unchanged tree produce the same sequence.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{
    error::CatalogError,
    types::{AlbumUnit, FailureCategory, MediaFile, RejectedFile, Rejection},
    utils,
};

/// Largest file the remote service accepts (10 GiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Remote album titles are limited to this many characters.
pub const MAX_ALBUM_NAME_CHARS: usize = 100;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "avif", "bmp", "tif", "tiff", "ico",
    "cr2", "cr3", "nef", "arw", "dng", "orf", "raf", "rw2", "sr2",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "qt", "avi", "mkv", "wmv", "asf", "3gp", "3g2", "mpg", "mpeg", "mts",
    "m2ts", "mod", "tod", "webm", "flv",
];

/// Scans `root` and returns one [`AlbumUnit`] per sub-folder.
///
/// Fails with [`CatalogError::InvalidRoot`] if `root` is not a readable
/// directory. Album folders that cannot be read are logged and skipped so a
/// single bad folder does not abort the whole run.
pub fn scan(root: &Path) -> Result<Vec<AlbumUnit>, CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidRoot {
        path: root.to_path_buf(),
        reason,
    };

    let meta = fs::metadata(root).map_err(|e| invalid(e.to_string()))?;
    if !meta.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    fs::read_dir(root).map_err(|e| invalid(e.to_string()))?;

    let mut albums = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_dir() || is_hidden(entry.path()) {
            continue;
        }

        match scan_album(entry.path()) {
            Ok(album) => albums.push(album),
            Err(e) => tracing::warn!(folder = %entry.path().display(), "skipping album folder: {}", e),
        }
    }

    Ok(albums)
}

/// Scans a single album folder.
pub fn scan_album(folder: &Path) -> Result<AlbumUnit, CatalogError> {
    let base_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut files = Vec::new();
    let mut rejected = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() || is_hidden(entry.path()) {
            continue;
        }

        let size = entry.metadata().map_err(walk_error)?.len();
        let file = MediaFile::new(entry.into_path(), size);
        match classify(&file) {
            Some(rejection) => rejected.push(RejectedFile { file, rejection }),
            None => files.push(file),
        }
    }

    Ok(AlbumUnit {
        name: truncate_album_name(&base_name),
        path: folder.to_path_buf(),
        files,
        rejected,
    })
}

/// Reads a single file back from disk, e.g. when replaying a failure record.
pub fn resolve_file(path: &Path) -> io::Result<MediaFile> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(MediaFile::new(path.to_path_buf(), meta.len()))
}

/// Decides whether a file can be uploaded at all. Size is checked before the
/// extension, so an oversized file of an unknown type is filed as `TooLarge`.
pub fn classify(file: &MediaFile) -> Option<Rejection> {
    if file.size_bytes > MAX_FILE_SIZE {
        return Some(Rejection {
            category: FailureCategory::TooLarge,
            reason: format!(
                "File too large: {} exceeds the {} limit",
                utils::format_size(file.size_bytes),
                utils::format_size(MAX_FILE_SIZE)
            ),
        });
    }

    if !is_supported_extension(&file.extension) {
        let reason = if file.extension.is_empty() {
            "File has no extension".to_string()
        } else {
            format!("Unsupported file extension '.{}'", file.extension)
        };
        return Some(Rejection {
            category: FailureCategory::UnsupportedFormat,
            reason,
        });
    }

    None
}

pub fn is_supported_extension(extension: &str) -> bool {
    let ext = extension.to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Album names are cut to the remote title limit on character boundaries.
pub fn truncate_album_name(name: &str) -> String {
    name.chars().take(MAX_ALBUM_NAME_CHARS).collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn walk_error(err: walkdir::Error) -> CatalogError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    CatalogError::Io { path, source }
}
