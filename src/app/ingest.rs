use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::IngestError;

/// Producer side of the bounded user-message queue.
#[derive(Debug, Clone)]
pub struct Inbox {
    sender: Sender<String>,
}

pub fn inbox(capacity: usize) -> (Inbox, Receiver<String>) {
    let (sender, receiver) = bounded(capacity.max(1));
    (Inbox { sender }, receiver)
}

impl Inbox {
    /// Queues a message without blocking.
    pub fn submit(&self, message: impl Into<String>) -> Result<(), IngestError> {
        self.sender.try_send(message.into()).map_err(|e| match e {
            TrySendError::Full(_) => IngestError::Full,
            TrySendError::Disconnected(_) => IngestError::Closed,
        })
    }
}
