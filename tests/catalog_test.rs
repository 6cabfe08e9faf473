use std::fs;
use std::path::Path;

use gphotos_uploader::catalog::*;
use gphotos_uploader::error::CatalogError;
use gphotos_uploader::types::{FailureCategory, MediaFile};
use tempfile::TempDir;

// Helper function to create a file with some content
fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"media").unwrap();
}

#[test]
fn test_scan_returns_one_album_per_folder_in_name_order() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("b-album/2.jpg"));
    touch(&root.path().join("b-album/1.jpg"));
    touch(&root.path().join("a-album/clip.mp4"));

    let albums = scan(root.path()).unwrap();

    let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a-album", "b-album"]);

    let files: Vec<&str> = albums[1].files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(files, vec!["1.jpg", "2.jpg"]);
}

#[test]
fn test_scan_is_stable_across_runs() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("x/a.jpg"));
    touch(&root.path().join("x/b.png"));
    touch(&root.path().join("y/c.mov"));

    assert_eq!(scan(root.path()).unwrap(), scan(root.path()).unwrap());
}

#[test]
fn test_scan_ignores_loose_files_hidden_entries_and_nested_folders() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("loose.jpg"));
    touch(&root.path().join(".hidden/a.jpg"));
    touch(&root.path().join("album/.DS_Store"));
    touch(&root.path().join("album/nested/deep.jpg"));
    touch(&root.path().join("album/ok.jpg"));

    let albums = scan(root.path()).unwrap();

    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].len(), 1);
    assert_eq!(albums[0].files[0].name, "ok.jpg");
}

#[test]
fn test_scan_keeps_empty_album_folders() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("empty")).unwrap();

    let albums = scan(root.path()).unwrap();

    assert_eq!(albums.len(), 1);
    assert!(albums[0].is_empty());
}

#[test]
fn test_scan_rejects_missing_root() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("does-not-exist");

    assert!(matches!(
        scan(&missing),
        Err(CatalogError::InvalidRoot { .. })
    ));
}

#[test]
fn test_scan_rejects_file_as_root() {
    let root = TempDir::new().unwrap();
    let file = root.path().join("file.jpg");
    touch(&file);

    assert!(matches!(scan(&file), Err(CatalogError::InvalidRoot { .. })));
}

#[test]
fn test_unsupported_files_are_listed_as_rejected() {
    let root = TempDir::new().unwrap();
    touch(&root.path().join("album/photo.JPG"));
    touch(&root.path().join("album/notes.txt"));
    touch(&root.path().join("album/README"));

    let album = scan_album(&root.path().join("album")).unwrap();

    assert_eq!(album.files.len(), 1);
    assert_eq!(album.rejected.len(), 2);
    assert!(
        album
            .rejected
            .iter()
            .all(|r| r.rejection.category == FailureCategory::UnsupportedFormat)
    );
}

#[test]
fn test_size_limit_is_inclusive() {
    let exact = MediaFile::new("/photos/a/exact.mp4".into(), MAX_FILE_SIZE);
    let over = MediaFile::new("/photos/a/over.mp4".into(), MAX_FILE_SIZE + 1);

    assert!(classify(&exact).is_none());
    assert_eq!(
        classify(&over).map(|r| r.category),
        Some(FailureCategory::TooLarge)
    );
}

#[test]
fn test_too_large_wins_over_unsupported_format() {
    let file = MediaFile::new("/photos/a/backup.iso".into(), MAX_FILE_SIZE + 1);

    assert_eq!(
        classify(&file).map(|r| r.category),
        Some(FailureCategory::TooLarge)
    );
}

#[test]
fn test_extension_check_is_case_insensitive() {
    assert!(is_supported_extension("HEIC"));
    assert!(is_supported_extension("mov"));
    assert!(!is_supported_extension("psd"));
    assert!(!is_supported_extension(""));
}

#[test]
fn test_album_names_are_truncated_on_char_boundaries() {
    let long: String = "é".repeat(MAX_ALBUM_NAME_CHARS + 20);
    let truncated = truncate_album_name(&long);

    assert_eq!(truncated.chars().count(), MAX_ALBUM_NAME_CHARS);
    assert_eq!(truncate_album_name("Summer"), "Summer");
}

#[test]
fn test_long_folder_name_becomes_truncated_album_name() {
    let root = TempDir::new().unwrap();
    let folder_name = "x".repeat(MAX_ALBUM_NAME_CHARS + 5);
    touch(&root.path().join(&folder_name).join("a.jpg"));

    let albums = scan(root.path()).unwrap();

    assert_eq!(albums[0].name.len(), MAX_ALBUM_NAME_CHARS);
    assert_eq!(albums[0].name, scan(root.path()).unwrap()[0].name);
}

#[test]
fn test_resolve_file_reads_size_from_disk() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("album/a.jpg");
    touch(&path);

    let file = resolve_file(&path).unwrap();

    assert_eq!(file.size_bytes, 5);
    assert_eq!(file.name, "a.jpg");
    assert_eq!(file.extension, "jpg");
    assert!(resolve_file(&root.path().join("album/missing.jpg")).is_err());
    assert!(resolve_file(&root.path().join("album")).is_err());
}
