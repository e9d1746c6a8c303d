use std::{fs, path::Path};

use skylift_transfer::entry::{self, Entry, LocalDirectoryReader};
use tempfile::TempDir;

const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directories");
    }
    fs::write(path, content).expect("write file");
}

fn setup_tree() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let photos = dir.path().join("photos");

    write(&photos.join("a.txt"), b"hello");
    write(&photos.join("empty"), b"");
    write(&photos.join(".DS_Store"), b"finder");
    write(&photos.join(".git/config"), b"[core]");
    write(&photos.join("sub/b.png"), &PNG_HEADER);
    write(&dir.path().join("notes.md"), b"# notes");

    dir
}

#[tokio::test]
async fn folder_drop_is_expanded_and_filtered() {
    let dir = setup_tree();
    let reader = LocalDirectoryReader;

    let entries = vec![
        reader
            .entry(&dir.path().join("photos"))
            .await
            .expect("photos exists"),
        reader
            .entry(&dir.path().join("notes.md"))
            .await
            .expect("notes exists"),
    ];

    let files = entry::scan(entries, &reader).await;

    let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(vec!["photos/a.txt", "photos/sub/b.png", "notes.md"], paths);

    let png = files
        .iter()
        .find(|f| f.name == "b.png")
        .expect("png was scanned");
    assert_eq!(Some("image/png"), png.content_type.as_deref());
    assert_eq!(8, png.size);
}

#[tokio::test]
async fn local_entries_are_typed_by_metadata() {
    let dir = setup_tree();
    let reader = LocalDirectoryReader;

    let photos = reader
        .entry(&dir.path().join("photos"))
        .await
        .expect("photos exists");
    let notes = reader
        .entry(&dir.path().join("notes.md"))
        .await
        .expect("notes exists");

    assert!(matches!(photos, Entry::Directory(ref d) if d.name == "photos"));
    assert!(matches!(notes, Entry::File(ref f) if f.size == 7));
}

#[tokio::test]
async fn missing_source_fails() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let reader = LocalDirectoryReader;

    assert!(reader.entry(&dir.path().join("missing")).await.is_err());
}

#[tokio::test]
async fn flat_selection_drops_typeless_empty_files() {
    let dir = setup_tree();
    let reader = LocalDirectoryReader;

    let files = vec![
        reader
            .file(&dir.path().join("photos/empty"))
            .await
            .expect("empty exists"),
        reader
            .file(&dir.path().join("photos/a.txt"))
            .await
            .expect("a.txt exists"),
    ];

    let files = entry::flatten(files);

    let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(vec!["a.txt"], paths);
}
