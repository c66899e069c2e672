//! Side channel for persistence failures that are not thrown at the caller.

use domains::AdId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PersistenceEvent {
    DeleteFailed { ad_id: AdId, reason: String },
    ImageCleanupFailed { ad_id: AdId, url: String, reason: String },
}

/// Cloneable publisher; every clone feeds the same subscribers.
#[derive(Debug, Clone)]
pub struct ErrorEvents {
    tx: broadcast::Sender<PersistenceEvent>,
}

impl ErrorEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PersistenceEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: PersistenceEvent) {
        // No subscribers is fine: the failure has already been logged.
        if self.tx.send(event).is_err() {
            debug!("persistence event dropped, no subscribers");
        }
    }
}

impl Default for ErrorEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let events = ErrorEvents::default();
        let mut rx = events.subscribe();
        let ad_id = AdId::new("a1").unwrap();
        events.publish(PersistenceEvent::DeleteFailed {
            ad_id: ad_id.clone(),
            reason: "offline".into(),
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            PersistenceEvent::DeleteFailed { ad_id, reason: "offline".into() }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        ErrorEvents::default().publish(PersistenceEvent::DeleteFailed {
            ad_id: AdId::new("a1").unwrap(),
            reason: "offline".into(),
        });
    }
}
