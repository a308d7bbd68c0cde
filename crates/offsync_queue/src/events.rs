//! Event feed for observing queue activity.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

/// Handle identifying one subscription.
pub type SubscriberId = u64;

/// A single event from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// An item was enqueued.
    ItemAdded(Uuid),
    /// A drain pass started.
    SyncStarted,
    /// An item was delivered and removed from the queue.
    ItemSynced(Uuid),
    /// An item exhausted its retries and parked as failed.
    ItemFailed(Uuid, String),
    /// A drain pass finished.
    SyncCompleted {
        /// Items delivered during the pass.
        synced: u64,
        /// Attempts that failed during the pass.
        failed: u64,
    },
    /// A drain pass aborted before completing.
    SyncFailed(String),
}

/// Distributes queue events to subscribers.
///
/// Thread-safe; events are delivered in emit order. Disconnected
/// subscribers are dropped on the next emit.
#[derive(Debug, Default)]
pub struct EventFeed {
    subscribers: RwLock<Vec<(SubscriberId, Sender<QueueEvent>)>>,
    next_id: AtomicU64,
}

impl EventFeed {
    /// Creates an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the feed.
    ///
    /// The receiver should be polled regularly to avoid unbounded
    /// channel growth.
    pub fn subscribe(&self) -> (SubscriberId, Receiver<QueueEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push((id, tx));
        (id, rx)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|(sid, _)| *sid != id);
    }

    /// Emits an event to all subscribers, dropping disconnected ones.
    pub fn emit(&self, event: QueueEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_every_subscriber_in_order() {
        let feed = EventFeed::new();
        let (_, rx1) = feed.subscribe();
        let (_, rx2) = feed.subscribe();

        let id = Uuid::new_v4();
        feed.emit(QueueEvent::ItemAdded(id));
        feed.emit(QueueEvent::SyncStarted);

        for rx in [&rx1, &rx2] {
            assert_eq!(rx.try_recv().unwrap(), QueueEvent::ItemAdded(id));
            assert_eq!(rx.try_recv().unwrap(), QueueEvent::SyncStarted);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let feed = EventFeed::new();
        let (id, rx) = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        feed.unsubscribe(id);
        assert_eq!(feed.subscriber_count(), 0);

        feed.emit(QueueEvent::SyncStarted);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_pruned_on_emit() {
        let feed = EventFeed::new();
        let (_, rx) = feed.subscribe();
        drop(rx);

        feed.emit(QueueEvent::SyncStarted);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
