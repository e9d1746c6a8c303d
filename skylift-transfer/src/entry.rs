use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{
    future::{join_all, BoxFuture},
    FutureExt,
};
use tokio::fs;

use crate::error::AppError;

pub const IGNORED_NAMES: [&str; 6] = [
    ".metadata",
    ".DS_Store",
    ".git",
    "Thumbs.db",
    ".idea",
    ".vscode",
];

const PLACEHOLDER_SIZES: [u64; 2] = [0, 4096];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Entry {
    Directory(DirectoryHandle),
    File(FileHandle),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectoryHandle {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileHandle {
    pub content_type: Option<String>,
    pub name: String,
    pub path: PathBuf,
    pub relative_path: String,
    pub size: u64,
}

/// Lists the immediate children of a directory entry.
#[async_trait]
pub trait DirectoryReader: Send + Sync {
    async fn read_children(&self, directory: &DirectoryHandle) -> Result<Vec<Entry>, AppError>;
}

/// Some platforms emit the selected directory itself as a typeless file of
/// zero or one block in size.
pub fn is_folder_placeholder(content_type: Option<&str>, size: u64) -> bool {
    content_type.map_or(true, |ct| ct.is_empty()) && PLACEHOLDER_SIZES.contains(&size)
}

pub fn is_ignored_name(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
}

fn is_ignored(file: &FileHandle) -> bool {
    let path = format!("/{}", file.relative_path);
    IGNORED_NAMES
        .iter()
        .any(|name| file.name == *name || path.contains(&format!("/{}/", name)))
}

fn is_uploadable(file: &FileHandle) -> bool {
    !is_folder_placeholder(file.content_type.as_deref(), file.size) && !is_ignored(file)
}

/// Expands dropped entries into a flat, ordered list of uploadable files.
/// A directory that can not be listed only drops its own branch.
#[tracing::instrument(skip(entries, reader))]
pub async fn scan<R>(entries: Vec<Entry>, reader: &R) -> Vec<FileHandle>
where
    R: DirectoryReader + ?Sized,
{
    let branches = entries
        .into_iter()
        .map(|entry| expand(entry, String::new(), reader));

    let files: Vec<_> = join_all(branches).await.into_iter().flatten().collect();
    let count = files.len();

    let files: Vec<_> = files.into_iter().filter(is_uploadable).collect();
    if files.len() < count {
        tracing::debug!(
            "filtered {} placeholder or ignored entries",
            count - files.len()
        );
    }

    files
}

/// Fallback without directory traversal: the raw file list only loses its
/// folder placeholders.
pub fn flatten(files: Vec<FileHandle>) -> Vec<FileHandle> {
    files
        .into_iter()
        .filter(|file| {
            let placeholder = is_folder_placeholder(file.content_type.as_deref(), file.size);
            if placeholder {
                tracing::warn!("skipping folder placeholder: {:?}", file.path);
            }
            !placeholder
        })
        .map(|mut file| {
            if file.relative_path.is_empty() {
                file.relative_path = file.name.clone();
            }
            file
        })
        .collect()
}

fn expand<'a, R>(entry: Entry, path: String, reader: &'a R) -> BoxFuture<'a, Vec<FileHandle>>
where
    R: DirectoryReader + ?Sized,
{
    async move {
        match entry {
            Entry::File(mut file) => {
                file.relative_path = format!("{}{}", path, file.name);
                vec![file]
            }
            Entry::Directory(directory) => {
                if is_ignored_name(&directory.name) {
                    tracing::trace!("skipping ignored directory: {:?}", directory.path);
                    return Vec::new();
                }

                let children = match reader.read_children(&directory).await {
                    Ok(children) => children,
                    Err(error) => {
                        tracing::warn!(
                            "reading directory {:?} failed: {:?}",
                            directory.path,
                            error
                        );
                        return Vec::new();
                    }
                };

                let path = format!("{}{}/", path, directory.name);
                let branches = children
                    .into_iter()
                    .map(|child| expand(child, path.clone(), reader));

                join_all(branches).await.into_iter().flatten().collect()
            }
        }
    }
    .boxed()
}

#[derive(Debug, Default)]
pub struct LocalDirectoryReader;

impl LocalDirectoryReader {
    pub async fn entry(&self, path: &Path) -> Result<Entry, AppError> {
        let metadata = fs::metadata(path).await?;
        let name = file_name(path)?;

        if metadata.is_dir() {
            Ok(Entry::Directory(DirectoryHandle {
                name,
                path: path.to_path_buf(),
            }))
        } else {
            Ok(Entry::File(FileHandle {
                content_type: content_type(path),
                name,
                path: path.to_path_buf(),
                relative_path: String::new(),
                size: metadata.len(),
            }))
        }
    }

    /// Treats every path as a plain file, directories included.
    pub async fn file(&self, path: &Path) -> Result<FileHandle, AppError> {
        let metadata = fs::metadata(path).await?;
        let content_type = if metadata.is_dir() {
            None
        } else {
            content_type(path)
        };

        Ok(FileHandle {
            content_type,
            name: file_name(path)?,
            path: path.to_path_buf(),
            relative_path: String::new(),
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl DirectoryReader for LocalDirectoryReader {
    async fn read_children(&self, directory: &DirectoryHandle) -> Result<Vec<Entry>, AppError> {
        let mut read_dir = fs::read_dir(&directory.path).await?;

        let mut children = Vec::new();
        while let Some(child) = read_dir.next_entry().await? {
            match self.entry(&child.path()).await {
                Ok(entry) => children.push(entry),
                Err(error) => {
                    tracing::warn!("reading entry {:?} failed: {:?}", child.path(), error);
                }
            }
        }

        children.sort_by(|a, b| entry_name(a).cmp(entry_name(b)));

        Ok(children)
    }
}

fn entry_name(entry: &Entry) -> &str {
    match entry {
        Entry::Directory(directory) => &directory.name,
        Entry::File(file) => &file.name,
    }
}

fn file_name(path: &Path) -> Result<String, AppError> {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => Ok(name.to_owned()),
        None => Err(AppError::InvalidTargetPath),
    }
}

fn content_type(path: &Path) -> Option<String> {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => Some(kind.mime_type().to_owned()),
        Ok(None) => None,
        Err(error) => {
            tracing::trace!("sniffing content type of {:?} failed: {:?}", path, error);
            None
        }
    }
}
