use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionEvent {
    Updated { id: String, version: u64 },
    Deleted { id: String },
}

impl SubmissionEvent {
    pub fn id(&self) -> &str {
        match self {
            SubmissionEvent::Updated { id, .. } | SubmissionEvent::Deleted { id } => id,
        }
    }
}

/// Fan-out of submission changes to in-process watchers.
pub struct SubmissionEvents {
    tx: broadcast::Sender<SubmissionEvent>,
}

impl SubmissionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: SubmissionEvent) {
        // No receivers is the common case.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.tx.subscribe()
    }
}

impl Default for SubmissionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_published_after_subscribing() {
        let events = SubmissionEvents::new();
        events.publish(SubmissionEvent::Deleted { id: "early".into() });

        let mut rx = events.subscribe();
        events.publish(SubmissionEvent::Updated {
            id: "alice".into(),
            version: 2,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id(), "alice");
    }
}
