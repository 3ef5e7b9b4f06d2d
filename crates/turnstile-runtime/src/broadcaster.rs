//! Status Broadcaster (C7, §4.7): pushes window-state transitions to
//! subscribed WebSocket clients. Each subscriber gets its own bounded
//! channel; publishing never blocks the publisher — a slow or gone
//! subscriber is dropped rather than stalling a schedule mutation or
//! backing up behind another subscriber.

use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use turnstile_core::model::StatusDocument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

pub struct StatusBroadcaster {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<StatusDocument>>>,
    buffer: usize,
}

impl StatusBroadcaster {
    pub fn new(buffer: usize) -> Self {
        Self { subscribers: RwLock::new(HashMap::new()), buffer }
    }

    /// Register a new subscriber and hand back its id (for `detach`) and
    /// the receiving half of its dedicated channel.
    pub async fn attach(&self) -> (SubscriberId, mpsc::Receiver<StatusDocument>) {
        let id = SubscriberId(Uuid::new_v4());
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn detach(&self, id: SubscriberId) {
        self.subscribers.write().await.remove(&id);
    }

    /// Best-effort publish: a subscriber whose buffer is full or whose
    /// receiver has been dropped is skipped. Neither condition is treated
    /// as an error -- the next `status` poll or reconnect catches it up.
    pub async fn publish(&self, status: StatusDocument) {
        let subscribers = self.subscribers.read().await;
        for tx in subscribers.values() {
            let _ = tx.try_send(status.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use turnstile_core::model::WindowStatus;

    fn doc() -> StatusDocument {
        StatusDocument {
            status: WindowStatus::Open,
            warning: false,
            message: "service open".to_string(),
            minutes_until_close: None,
            is_manual_override: false,
            override_reason: None,
            override_expires_at: None,
        }
    }

    #[tokio::test]
    async fn attach_then_publish_delivers() {
        let b = StatusBroadcaster::new(4);
        let (_id, mut rx) = b.attach().await;
        b.publish(doc()).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.status, WindowStatus::Open);
    }

    #[tokio::test]
    async fn detach_stops_delivery() {
        let b = StatusBroadcaster::new(4);
        let (id, mut rx) = b.attach().await;
        b.detach(id).await;
        b.publish(doc()).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_block() {
        let b = StatusBroadcaster::new(4);
        let start = Utc::now();
        b.publish(doc()).await;
        assert!((Utc::now() - start).num_seconds() < 1);
    }
}
