use crate::{
    action::Action,
    event::{Message, TransferEvent},
    model::{BatchModel, BatchStatus, TransferState},
};

pub fn start(model: &mut BatchModel) {
    model.states = model
        .items
        .keys()
        .map(|index| (*index, TransferState::Pending))
        .collect();

    model.progress.clear();
    model.status = BatchStatus::Running;
}

/// Applies one message and returns the resulting side effects. Every call
/// ends with a completion check so the final transition can not be missed.
#[tracing::instrument(skip(model))]
pub fn update(model: &mut BatchModel, message: &Message) -> Vec<Action> {
    let mut actions = match message {
        Message::Cancel(index) => cancel(model, *index),
        Message::CancelAll => cancel_all(model),
        Message::Remove(index) => remove(model, *index),
        Message::Transfer(index, event) => {
            transfer(model, *index, event);
            Vec::new()
        }
    };

    actions.extend(check_completion(model));
    actions
}

/// Finished and cancelled items count as fully accounted for, everything
/// else contributes its last reported percent.
pub fn aggregate_progress(model: &BatchModel) -> u8 {
    if model.items.is_empty() {
        return 0;
    }

    let total: u32 = model
        .items
        .keys()
        .map(|index| match model.state(*index) {
            Some(TransferState::Success) | Some(TransferState::Cancelled) => 100,
            _ => u32::from(model.progress.get(index).copied().unwrap_or(0)),
        })
        .sum();

    (f64::from(total) / model.items.len() as f64).round() as u8
}

fn cancel(model: &BatchModel, index: usize) -> Vec<Action> {
    match model.state(index) {
        Some(state) if !state.is_terminal() => vec![Action::Abort(index)],
        _ => Vec::new(),
    }
}

fn cancel_all(model: &mut BatchModel) -> Vec<Action> {
    let actions = model
        .states
        .iter()
        .filter(|(_, state)| !state.is_terminal())
        .map(|(index, _)| Action::Abort(*index))
        .collect();

    if model.status == BatchStatus::Running {
        model.status = BatchStatus::Idle;
    }

    actions
}

fn remove(model: &mut BatchModel, index: usize) -> Vec<Action> {
    let actions = cancel(model, index);
    if model.remove(index).is_none() {
        tracing::warn!("removing unknown item: {}", index);
    }
    actions
}

fn transfer(model: &mut BatchModel, index: usize, event: &TransferEvent) {
    let state = match model.state(index) {
        Some(state) if model.items.contains_key(&index) => state,
        _ => {
            tracing::trace!("ignoring event for removed item {}: {:?}", index, event);
            return;
        }
    };

    match event {
        TransferEvent::Started => {
            if state == TransferState::Pending {
                model.states.insert(index, TransferState::Uploading);
            }
        }
        TransferEvent::Progress(percent) => {
            if state != TransferState::Uploading {
                return;
            }

            let current = model.progress.entry(index).or_insert(0);
            if *percent > *current {
                *current = (*percent).min(100);
            }
        }
        TransferEvent::Finished(terminal) => {
            if state.is_terminal() || !terminal.is_terminal() {
                tracing::warn!(
                    "invalid transition for item {}: {:?} -> {:?}",
                    index,
                    state,
                    terminal
                );
                return;
            }

            model.states.insert(index, *terminal);
            if *terminal == TransferState::Success {
                model.progress.insert(index, 100);
            }
        }
    }
}

fn check_completion(model: &mut BatchModel) -> Vec<Action> {
    match model.status {
        BatchStatus::Running if model.items.is_empty() => {
            model.status = BatchStatus::Idle;
            vec![Action::Stop]
        }
        BatchStatus::Running if model.is_done() => vec![Action::Complete],
        BatchStatus::Idle if model.is_done() => vec![Action::Stop],
        _ => Vec::new(),
    }
}
