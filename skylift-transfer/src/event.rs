use tokio::sync::mpsc;

use crate::model::TransferState;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    Cancel(usize),
    CancelAll,
    Remove(usize),
    Transfer(usize, TransferEvent),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransferEvent {
    Finished(TransferState),
    Progress(u8),
    Started,
}

/// Outward callbacks of a single transfer unit.
pub trait TransferObserver: Send + Sync {
    fn on_started(&self);
    fn on_progress(&self, percent: u8);
    fn on_terminal(&self, state: TransferState);
}

/// Forwards unit callbacks as messages into the coordinator loop.
pub struct ChannelObserver {
    index: usize,
    sender: mpsc::UnboundedSender<Message>,
}

impl ChannelObserver {
    pub fn new(index: usize, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self { index, sender }
    }

    fn send(&self, event: TransferEvent) {
        if let Err(error) = self.sender.send(Message::Transfer(self.index, event)) {
            tracing::error!("sending transfer event failed: {:?}", error);
        }
    }
}

impl TransferObserver for ChannelObserver {
    fn on_started(&self) {
        self.send(TransferEvent::Started);
    }

    fn on_progress(&self, percent: u8) {
        self.send(TransferEvent::Progress(percent));
    }

    fn on_terminal(&self, state: TransferState) {
        self.send(TransferEvent::Finished(state));
    }
}

/// Handle for other tasks to steer a running batch.
#[derive(Clone, Debug)]
pub struct BatchController {
    sender: mpsc::UnboundedSender<Message>,
}

impl BatchController {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self { sender }
    }

    pub fn cancel(&self, index: usize) {
        self.send(Message::Cancel(index));
    }

    pub fn cancel_all(&self) {
        self.send(Message::CancelAll);
    }

    pub fn remove(&self, index: usize) {
        self.send(Message::Remove(index));
    }

    fn send(&self, message: Message) {
        tracing::debug!("sending batch message: {:?}", message);
        if let Err(error) = self.sender.send(message) {
            tracing::error!("sending batch message failed: {:?}", error);
        }
    }
}
