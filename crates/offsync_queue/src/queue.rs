//! The durable sync queue and its drain loop.

use crate::action::SyncAction;
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::events::{EventFeed, QueueEvent, SubscriberId};
use crate::history::{ConflictRecord, HistoryRecord};
use crate::item::{ItemStatus, QueueItem};
use offsync_store::{Clock, DurableStore, Table};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Options for enqueueing an item.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Drain priority.
    pub priority: offsync_store::Priority,
    /// Host-supplied labels, carried opaquely.
    pub metadata: std::collections::BTreeMap<String, String>,
    /// Items that must leave the queue before this one is eligible.
    pub dependencies: Vec<Uuid>,
}

impl AddOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: offsync_store::Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a metadata label.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, id: Uuid) -> Self {
        self.dependencies.push(id);
        self
    }
}

/// Result of one completed drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Items delivered and removed from the queue.
    pub synced: u64,
    /// Attempts that failed (rescheduled or parked as failed).
    pub failed: u64,
}

/// A point-in-time snapshot of queue health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    /// Items waiting for delivery.
    pub pending: usize,
    /// Items currently being delivered.
    pub processing: usize,
    /// Items parked with retries exhausted.
    pub failed: usize,
    /// Whether the host reports connectivity.
    pub connected: bool,
    /// Whether a drain pass is running right now.
    pub in_flight: bool,
}

/// The durable, prioritized sync queue.
///
/// Items persist in the durable store, so a restart resumes where the
/// previous process left off. The host owns connectivity signaling and
/// the transport; the queue owns scheduling, retry, and bookkeeping.
pub struct SyncQueue {
    config: QueueConfig,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn crate::transport::SyncTransport>,
    connectivity: Arc<dyn crate::transport::Connectivity>,
    events: EventFeed,
    draining: AtomicBool,
    periodic_stop: Arc<AtomicBool>,
    periodic_thread: Mutex<Option<JoinHandle<()>>>,
}

/// Resets the drain flag when a pass ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncQueue {
    /// Creates a queue over the given collaborators.
    ///
    /// Items already in the store (from a previous run) are picked up by
    /// the next drain pass; any left as `Processing` by a crash are
    /// reset to `Pending` here.
    ///
    /// # Errors
    ///
    /// Returns an error if the recovery scan fails.
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn crate::transport::SyncTransport>,
        connectivity: Arc<dyn crate::transport::Connectivity>,
    ) -> QueueResult<Self> {
        let queue = Self {
            config,
            store,
            clock,
            transport,
            connectivity,
            events: EventFeed::new(),
            draining: AtomicBool::new(false),
            periodic_stop: Arc::new(AtomicBool::new(false)),
            periodic_thread: Mutex::new(None),
        };
        queue.recover_interrupted()?;
        Ok(queue)
    }

    fn recover_interrupted(&self) -> QueueResult<()> {
        let mut recovered = 0;
        for item in self.load_items()? {
            if item.status == ItemStatus::Processing {
                let mut item = item;
                item.status = ItemStatus::Pending;
                self.put_item(&item)?;
                recovered += 1;
            }
        }
        if recovered > 0 {
            info!(recovered, "reset interrupted items to pending");
        }
        Ok(())
    }

    /// Subscribes to queue events.
    pub fn subscribe(&self) -> (SubscriberId, Receiver<QueueEvent>) {
        self.events.subscribe()
    }

    /// Removes an event subscription.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    /// Enqueues a mutation for delivery.
    ///
    /// The item is persisted as `Pending` before this returns. When the
    /// host is connected, a drain is triggered in the background; the
    /// caller never waits on the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be persisted.
    pub fn add(
        self: &Arc<Self>,
        action: SyncAction,
        options: AddOptions,
    ) -> QueueResult<Uuid> {
        let now = self.clock.now_ms();
        let mut item = QueueItem::new(action, options.priority, now);
        item.metadata = options.metadata;
        item.dependencies = options.dependencies;
        let id = item.id;

        self.put_item(&item)?;
        debug!(%id, kind = item.action.kind(), "item enqueued");
        self.events.emit(QueueEvent::ItemAdded(id));

        if self.connectivity.is_connected() {
            let queue = Arc::clone(self);
            std::thread::spawn(move || {
                if let Err(e) = queue.process_queue() {
                    warn!(error = %e, "opportunistic drain failed");
                }
            });
        }

        Ok(id)
    }

    /// Runs one drain pass.
    ///
    /// At most one pass runs at a time; a call that loses the race
    /// returns `Ok(None)` without touching the queue. Item failures are
    /// recorded and never abort the pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue table cannot be read or written;
    /// transport failures are per-item outcomes, not errors.
    pub fn process_queue(&self) -> QueueResult<Option<DrainReport>> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }
        let _guard = DrainGuard(&self.draining);

        self.events.emit(QueueEvent::SyncStarted);
        match self.drain_pass() {
            Ok(report) => {
                self.events.emit(QueueEvent::SyncCompleted {
                    synced: report.synced,
                    failed: report.failed,
                });
                Ok(Some(report))
            }
            Err(e) => {
                self.events.emit(QueueEvent::SyncFailed(e.to_string()));
                Err(e)
            }
        }
    }

    fn drain_pass(&self) -> QueueResult<DrainReport> {
        let now = self.clock.now_ms();
        let items = self.load_items()?;
        let in_queue: HashSet<Uuid> = items.iter().map(|i| i.id).collect();

        let mut eligible: Vec<QueueItem> = items
            .into_iter()
            .filter(|item| {
                item.is_due(now) && item.dependencies.iter().all(|dep| !in_queue.contains(dep))
            })
            .collect();
        eligible.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(a.enqueued_at_ms.cmp(&b.enqueued_at_ms))
        });

        let mut report = DrainReport { synced: 0, failed: 0 };
        for item in eligible {
            if self.attempt(item)? {
                report.synced += 1;
            } else {
                report.failed += 1;
            }
        }

        debug!(synced = report.synced, failed = report.failed, "drain pass finished");
        Ok(report)
    }

    /// Delivers one item. Returns `Ok(true)` on delivery, `Ok(false)`
    /// when the attempt failed (rescheduled or parked).
    fn attempt(&self, mut item: QueueItem) -> QueueResult<bool> {
        item.status = ItemStatus::Processing;
        self.put_item(&item)?;

        let started = Instant::now();
        let outcome = self.transport.call(&item.action, self.config.call_timeout);
        let duration_ms = started.elapsed().as_millis() as u64;
        let now = self.clock.now_ms();

        match outcome {
            Ok(result) => {
                self.store.delete(Table::SyncQueue, &item.id.to_string())?;
                let record =
                    HistoryRecord::delivered(item.id, item.action.kind(), now, duration_ms, result);
                self.put_history(&record)?;
                debug!(id = %item.id, "item delivered");
                self.events.emit(QueueEvent::ItemSynced(item.id));
                Ok(true)
            }
            Err(e) => {
                let message = e.to_string();
                if item.retries + 1 < self.config.max_retries {
                    let delay = self.config.retry_delay(item.retries);
                    item.retries += 1;
                    item.status = ItemStatus::Pending;
                    item.last_error = Some(message.clone());
                    item.next_retry_at_ms = now + delay.as_millis() as u64;
                    self.put_item(&item)?;
                    debug!(
                        id = %item.id,
                        retries = item.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "attempt failed; rescheduled"
                    );
                } else {
                    item.status = ItemStatus::Failed;
                    item.last_error = Some(message.clone());
                    self.put_item(&item)?;
                    let record = HistoryRecord::exhausted(
                        item.id,
                        item.action.kind(),
                        now,
                        duration_ms,
                        message.clone(),
                    );
                    self.put_history(&record)?;
                    warn!(id = %item.id, error = %message, "retries exhausted; item parked");
                    self.events.emit(QueueEvent::ItemFailed(item.id, message));
                }
                Ok(false)
            }
        }
    }

    /// Drains immediately, refusing while offline.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Offline` when the host reports no
    /// connectivity, otherwise any drain error.
    pub fn force_sync_now(&self) -> QueueResult<Option<DrainReport>> {
        if !self.connectivity.is_connected() {
            return Err(QueueError::Offline);
        }
        self.process_queue()
    }

    /// Reacts to the host going online: starts the periodic drain
    /// thread and triggers an immediate background drain.
    pub fn handle_online(self: &Arc<Self>) {
        info!("connectivity restored; starting periodic drain");
        let mut guard = self.periodic_thread.lock();
        if guard.is_some() {
            return;
        }
        self.periodic_stop.store(false, Ordering::SeqCst);

        // Weak handle so the thread cannot keep the queue alive on its own.
        let weak = Arc::downgrade(self);
        let interval = self.config.drain_interval;
        let stop = Arc::clone(&self.periodic_stop);
        *guard = Some(std::thread::spawn(move || loop {
            {
                let Some(queue) = weak.upgrade() else {
                    return;
                };
                if queue.connectivity.is_connected() {
                    if let Err(e) = queue.process_queue() {
                        warn!(error = %e, "periodic drain failed");
                    }
                }
            }
            let deadline = Instant::now() + interval;
            while Instant::now() < deadline {
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }));
    }

    /// Reacts to the host going offline: stops the periodic drain
    /// thread. Items stay queued for the next online transition.
    pub fn handle_offline(&self) {
        info!("connectivity lost; stopping periodic drain");
        self.periodic_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.periodic_thread.lock().take() {
            let _ = handle.join();
        }
    }

    /// Returns a snapshot of queue health.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue table cannot be read.
    pub fn status(&self) -> QueueResult<QueueStatus> {
        let mut status = QueueStatus {
            pending: 0,
            processing: 0,
            failed: 0,
            connected: self.connectivity.is_connected(),
            in_flight: self.draining.load(Ordering::SeqCst),
        };
        for item in self.load_items()? {
            match item.status {
                ItemStatus::Pending => status.pending += 1,
                ItemStatus::Processing => status.processing += 1,
                ItemStatus::Failed => status.failed += 1,
                ItemStatus::Completed => {}
            }
        }
        Ok(status)
    }

    /// Returns up to `limit` history records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history table cannot be read.
    pub fn history(&self, limit: usize) -> QueueResult<Vec<HistoryRecord>> {
        let mut records = Vec::new();
        for (_, bytes) in self.store.scan(Table::SyncHistory)? {
            records.push(HistoryRecord::decode(&bytes)?);
        }
        records.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        records.truncate(limit);
        Ok(records)
    }

    /// Deletes all history records.
    ///
    /// # Errors
    ///
    /// Returns an error if the history table cannot be cleared.
    pub fn clear_history(&self) -> QueueResult<()> {
        self.store.clear(Table::SyncHistory)?;
        Ok(())
    }

    /// Records a conflict against an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    pub fn record_conflict(&self, id: Uuid) -> QueueResult<()> {
        let record = ConflictRecord {
            id,
            timestamp_ms: self.clock.now_ms(),
            resolved: false,
        };
        self.store.put(
            Table::Conflicts,
            &id.to_string(),
            record.encode()?,
            Vec::new(),
        )?;
        Ok(())
    }

    /// Returns all recorded conflicts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the conflicts table cannot be read.
    pub fn conflicts(&self) -> QueueResult<Vec<ConflictRecord>> {
        let mut records = Vec::new();
        for (_, bytes) in self.store.scan(Table::Conflicts)? {
            records.push(ConflictRecord::decode(&bytes)?);
        }
        records.sort_by_key(|r| r.timestamp_ms);
        Ok(records)
    }

    fn load_items(&self) -> QueueResult<Vec<QueueItem>> {
        let mut items = Vec::new();
        for (_, bytes) in self.store.scan(Table::SyncQueue)? {
            items.push(QueueItem::decode(&bytes)?);
        }
        Ok(items)
    }

    fn put_item(&self, item: &QueueItem) -> QueueResult<()> {
        self.store.put(
            Table::SyncQueue,
            &item.id.to_string(),
            item.encode()?,
            item.index_entries(),
        )?;
        Ok(())
    }

    fn put_history(&self, record: &HistoryRecord) -> QueueResult<()> {
        self.store.put(
            Table::SyncHistory,
            &record.id.to_string(),
            record.encode()?,
            vec![offsync_store::IndexEntry::new(
                offsync_store::Index::Timestamp,
                record.timestamp_ms,
            )],
        )?;
        Ok(())
    }
}

impl Drop for SyncQueue {
    fn drop(&mut self) {
        self.periodic_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.periodic_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("in_flight", &self.draining.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
