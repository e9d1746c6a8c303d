use std::collections::BTreeMap;

use super::{BatchModel, BatchStatus, TransferState};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchSnapshot {
    pub items: Vec<ItemSnapshot>,
    pub progress: u8,
    pub status: BatchStatus,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ItemSnapshot {
    pub index: usize,
    pub progress: u8,
    pub relative_path: String,
    pub size: u64,
    pub state: Option<TransferState>,
}

impl BatchSnapshot {
    pub fn from(model: &BatchModel, progress: u8) -> Self {
        let items = model
            .items
            .iter()
            .map(|(index, item)| ItemSnapshot {
                index: *index,
                progress: model.progress.get(index).copied().unwrap_or(0),
                relative_path: item.relative_path.clone(),
                size: item.size,
                state: model.state(*index),
            })
            .collect();

        Self {
            items,
            progress,
            status: model.status,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.state == Some(TransferState::Error))
    }
}

/// Outcome of one `run_batch` call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchReport {
    pub states: BTreeMap<usize, TransferState>,
    pub status: BatchStatus,
}

impl BatchReport {
    pub fn count(&self, state: TransferState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    pub fn failed(&self) -> usize {
        self.count(TransferState::Error)
    }

    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}
