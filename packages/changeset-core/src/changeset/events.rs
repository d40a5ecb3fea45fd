use tokio::sync::broadcast;

/// Notification published by a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangesetEvent {
    /// A validation of the key is about to run
    BeforeValidation(String),
    /// A validation of the key has produced its verdict
    AfterValidation(String),
    /// The observable value or error state of the key changed
    PropertyChanged(String),
}

/// Fan-out of changeset events to any number of subscribers.
#[derive(Debug)]
pub(crate) struct Events {
    sender: broadcast::Sender<ChangesetEvent>,
}

impl Events {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangesetEvent> {
        self.sender.subscribe()
    }

    /// Publishes `event`; having no subscribers is fine.
    pub fn emit(&self, event: ChangesetEvent) {
        let _ = self.sender.send(event);
    }
}
