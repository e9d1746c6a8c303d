use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    action::Action,
    error::AppError,
    event::{BatchController, ChannelObserver, Message, TransferEvent},
    model::{
        snapshot::{BatchReport, BatchSnapshot},
        BatchModel, BatchStatus, TransferState, UploadItem,
    },
    path,
    settings::BatchSettings,
    task::{ObjectTransport, TransferUnit, UrlIssuer},
    update,
};

/// Owns every upload item of one user action together with their states,
/// progress and live transfer handles. Nothing else mutates them; running
/// units and other tasks talk to it through messages only.
pub struct BatchCoordinator {
    handles: HashMap<usize, CancellationToken>,
    issuer: Arc<dyn UrlIssuer>,
    model: BatchModel,
    receiver: mpsc::UnboundedReceiver<Message>,
    sender: mpsc::UnboundedSender<Message>,
    settings: BatchSettings,
    snapshot: watch::Sender<BatchSnapshot>,
    transport: Arc<dyn ObjectTransport>,
}

enum Finish {
    Complete,
    Stop,
}

impl BatchCoordinator {
    pub fn new(
        issuer: Arc<dyn UrlIssuer>,
        transport: Arc<dyn ObjectTransport>,
        settings: BatchSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(BatchSnapshot::default());

        Self {
            handles: HashMap::new(),
            issuer,
            model: BatchModel::default(),
            receiver,
            sender,
            settings,
            snapshot,
            transport,
        }
    }

    pub fn add_items(&mut self, items: Vec<UploadItem>) -> Result<Vec<usize>, AppError> {
        if self.model.status == BatchStatus::Running {
            return Err(AppError::BatchRunning);
        }

        let indices = items
            .into_iter()
            .map(|item| self.model.add(item))
            .collect();

        if self.model.status == BatchStatus::Completed {
            self.model.status = BatchStatus::Idle;
        }

        self.publish();
        Ok(indices)
    }

    /// Drops every item and its state.
    pub fn clear(&mut self) -> Result<(), AppError> {
        if self.model.status == BatchStatus::Running {
            return Err(AppError::BatchRunning);
        }

        self.model = BatchModel::default();
        self.handles.clear();
        self.publish();

        Ok(())
    }

    pub fn controller(&self) -> BatchController {
        BatchController::new(self.sender.clone())
    }

    pub fn model(&self) -> &BatchModel {
        &self.model
    }

    /// Removal while idle. Running batches remove through the controller.
    pub fn remove_item(&mut self, index: usize) -> Result<UploadItem, AppError> {
        if self.model.status == BatchStatus::Running {
            return Err(AppError::BatchRunning);
        }

        let item = self
            .model
            .remove(index)
            .ok_or(AppError::UnknownItem(index))?;

        self.publish();
        Ok(item)
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchSnapshot> {
        self.snapshot.subscribe()
    }

    /// Uploads every item concurrently into `destination_folder`. The
    /// completion callback runs exactly once, after every item reached a
    /// terminal state and both settle delays passed. A stop-all ends the run
    /// in `Idle` without invoking it.
    #[tracing::instrument(skip(self, on_complete))]
    pub async fn run_batch<F>(&mut self, destination_folder: &str, on_complete: F) -> BatchReport
    where
        F: FnOnce() + Send,
    {
        if self.model.status == BatchStatus::Running {
            tracing::warn!("batch is already running");
            return self.report();
        }

        if self.model.items.is_empty() {
            tracing::debug!("skipping run of empty batch");
            return self.report();
        }

        self.discard_stale_messages();
        update::start(&mut self.model);
        self.publish();

        let mut units = JoinSet::new();
        let mut actions = self.launch(destination_folder, &mut units);

        let finish = loop {
            if let Some(finish) = self.execute(actions) {
                break finish;
            }

            let message = match self.receiver.recv().await {
                Some(message) => message,
                None => break Finish::Stop,
            };

            if let Message::Transfer(index, TransferEvent::Finished(_)) = &message {
                self.handles.remove(index);
            }

            actions = update::update(&mut self.model, &message);
            self.publish();
        };

        match finish {
            Finish::Complete => {
                time::sleep(self.settings.settle_delay).await;

                self.model.status = BatchStatus::Completed;
                self.publish();

                time::sleep(self.settings.notify_delay).await;

                tracing::debug!("batch completed, notifying caller");
                on_complete();
            }
            Finish::Stop => {
                tracing::debug!("batch stopped before completion");
                self.model.status = BatchStatus::Idle;
                self.publish();
            }
        }

        self.handles.clear();
        while let Some(result) = units.join_next().await {
            if let Err(error) = result {
                tracing::error!("transfer unit failed: {:?}", error);
            }
        }

        self.report()
    }

    fn launch(
        &mut self,
        destination_folder: &str,
        units: &mut JoinSet<TransferState>,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        let items: Vec<_> = self
            .model
            .items
            .iter()
            .map(|(index, item)| (*index, item.clone()))
            .collect();

        for (index, item) in items {
            if item.is_placeholder() {
                tracing::warn!("skipping folder placeholder: {:?}", item.relative_path);
                let finished = TransferEvent::Finished(TransferState::Success);
                let message = Message::Transfer(index, finished);
                actions.extend(update::update(&mut self.model, &message));
                continue;
            }

            let token = CancellationToken::new();
            self.handles.insert(index, token.clone());

            let unit = TransferUnit {
                content_type: item
                    .content_type
                    .clone()
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or_else(|| self.settings.fallback_content_type.clone()),
                index,
                issuer: self.issuer.clone(),
                key: path::resolve_key(destination_folder, &item.relative_path),
                item,
                observer: Arc::new(ChannelObserver::new(index, self.sender.clone())),
                transport: self.transport.clone(),
            };

            units.spawn(unit.run(token));
        }

        self.publish();
        actions
    }

    fn execute(&mut self, actions: Vec<Action>) -> Option<Finish> {
        let mut finish = None;
        for action in actions {
            match action {
                Action::Abort(index) => match self.handles.remove(&index) {
                    Some(token) => token.cancel(),
                    None => tracing::warn!("no live transfer to abort for item {}", index),
                },
                Action::Complete => finish = Some(Finish::Complete),
                Action::Stop => finish = Some(Finish::Stop),
            }
        }
        finish
    }

    fn discard_stale_messages(&mut self) {
        while let Ok(message) = self.receiver.try_recv() {
            tracing::trace!("discarding message from previous run: {:?}", message);
        }
    }

    fn publish(&self) {
        let progress = update::aggregate_progress(&self.model);
        self.snapshot
            .send_replace(BatchSnapshot::from(&self.model, progress));
    }

    fn report(&self) -> BatchReport {
        BatchReport {
            states: self.model.states.clone(),
            status: self.model.status,
        }
    }
}
