use std::{collections::BTreeMap, path::PathBuf};

use crate::entry::{self, FileHandle};

pub mod snapshot;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadItem {
    pub content_type: Option<String>,
    pub relative_path: String,
    pub size: u64,
    pub source: PathBuf,
}

impl UploadItem {
    pub fn is_placeholder(&self) -> bool {
        entry::is_folder_placeholder(self.content_type.as_deref(), self.size)
    }
}

impl From<FileHandle> for UploadItem {
    fn from(file: FileHandle) -> Self {
        let relative_path = if file.relative_path.is_empty() {
            file.name
        } else {
            file.relative_path
        };

        Self {
            content_type: file.content_type,
            relative_path,
            size: file.size,
            source: file.path,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TransferState {
    #[default]
    Pending,
    Uploading,
    Success,
    Error,
    Cancelled,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Success | TransferState::Error | TransferState::Cancelled
        )
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BatchStatus {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Index keyed state of one upload action. Indices are handed out once and
/// never reused, so late events of removed items can not hit a new item.
#[derive(Debug, Default)]
pub struct BatchModel {
    pub items: BTreeMap<usize, UploadItem>,
    pub progress: BTreeMap<usize, u8>,
    pub states: BTreeMap<usize, TransferState>,
    pub status: BatchStatus,
    next_index: usize,
}

impl BatchModel {
    pub fn add(&mut self, item: UploadItem) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.items.insert(index, item);
        index
    }

    pub fn is_done(&self) -> bool {
        self.items.keys().all(|index| {
            self.states
                .get(index)
                .is_some_and(|state| state.is_terminal())
        })
    }

    pub fn remove(&mut self, index: usize) -> Option<UploadItem> {
        self.states.remove(&index);
        self.progress.remove(&index);
        self.items.remove(&index)
    }

    pub fn state(&self, index: usize) -> Option<TransferState> {
        self.states.get(&index).copied()
    }
}
