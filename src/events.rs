//! In-process upload notifications.
//!
//! An [`UploadBus`] is owned by whoever wires the vault together and handed to
//! the components that need it; there is no global instance. Subscribers only
//! see events emitted while they are subscribed: nothing is queued for late
//! subscribers and nothing is persisted.

use tokio::sync::broadcast;

/// Events buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// A resume finished uploading (blob stored and row written).
    Uploaded { owner_id: String, record_id: String },
}

impl UploadEvent {
    pub fn owner_id(&self) -> &str {
        match self {
            UploadEvent::Uploaded { owner_id, .. } => owner_id,
        }
    }
}

/// What a [`Subscription`] woke up for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Event(UploadEvent),
    /// The subscriber fell behind and `n` events were dropped; treat it as
    /// "something changed".
    Missed(u64),
}

#[derive(Debug, Clone)]
pub struct UploadBus {
    sender: broadcast::Sender<UploadEvent>,
}

impl Default for UploadBus {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event to everyone currently subscribed. Returns the number of
    /// subscribers reached; zero is not an error.
    pub fn emit(&self, event: UploadEvent) -> usize {
        let reached = self.sender.send(event).unwrap_or(0);
        tracing::trace!(subscribers = reached, "Emitted upload event");
        reached
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live registration on an [`UploadBus`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<UploadEvent>,
}

impl Subscription {
    /// Wait for the next notice. `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<Notice> {
        match self.receiver.recv().await {
            Ok(event) => Some(Notice::Event(event)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(Notice::Missed(n)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Wait for the next notice that concerns `owner_id`.
    pub async fn recv_for(&mut self, owner_id: &str) -> Option<Notice> {
        loop {
            match self.recv().await? {
                Notice::Event(event) if event.owner_id() != owner_id => continue,
                notice => return Some(notice),
            }
        }
    }
}
