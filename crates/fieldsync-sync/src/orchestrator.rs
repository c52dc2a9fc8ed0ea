// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync orchestrator: drains the local queue into the remote system.
//!
//! A pass is triggered by an offline-to-online edge, by a periodic tick while
//! online, by [`SyncOrchestrator::force_sync_now`], and once at start when
//! work is already waiting. At most one pass runs at a time; records within a
//! pass are processed sequentially and each record's failure is confined to
//! that record.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use fieldsync_config::model::SyncConfig;
use fieldsync_core::{
    BufferedVisit, Connectivity, FieldSyncError, SyncOutcome, SyncStatus, SyncStatusSnapshot,
    VisitQueue,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::Delivery;

type Callback = Arc<dyn Fn(SyncOutcome) + Send + Sync>;

/// Completion observers, shared between the orchestrator and its [`Subscription`]s.
#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback)>>,
}

impl Subscribers {
    fn add(&self, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, callback));
        id
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    fn notify(&self, outcome: SyncOutcome) {
        // Snapshot so a callback may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(outcome);
        }
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Callback)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle returned by [`SyncOrchestrator::on_sync_complete`].
///
/// Dropping the handle keeps the callback registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Remove the callback. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(self.id);
        }
    }
}

/// Scoped ownership of the single-flight flag; released on every exit path.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    queue: Arc<dyn VisitQueue>,
    delivery: Delivery,
    connectivity: Connectivity,
    config: SyncConfig,
    in_progress: AtomicBool,
    subscribers: Arc<Subscribers>,
}

/// Explicitly owned sync coordinator.
///
/// Construct with injected collaborators, then [`start`](Self::start) to arm
/// the triggers and [`stop`](Self::stop) to disarm them.
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl SyncOrchestrator {
    pub fn new(
        queue: Arc<dyn VisitQueue>,
        delivery: Delivery,
        connectivity: Connectivity,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue,
                delivery,
                connectivity,
                config,
                in_progress: AtomicBool::new(false),
                subscribers: Arc::new(Subscribers::default()),
            }),
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// Recover the queue, arm the connectivity listener and periodic timer,
    /// and run the startup pass if work is waiting and the backend is online.
    ///
    /// Calling `start` on a running orchestrator does nothing.
    pub async fn start(&self) -> Result<(), FieldSyncError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("sync orchestrator already running");
            return Ok(());
        }

        let report = self.inner.queue.recover().await?;
        info!(
            purged = report.purged,
            interrupted = report.interrupted,
            interval_secs = self.inner.config.interval_secs,
            "sync orchestrator starting"
        );

        let cancel = CancellationToken::new();
        let inner = self.inner.clone();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            inner.run_loop(loop_cancel).await;
        });

        *running = Some(Running { cancel, handle });
        Ok(())
    }

    /// Disarm all triggers. Waits for an in-flight pass to finish.
    ///
    /// Safe to call when never started or already stopped.
    pub async fn stop(&self) {
        let Some(Running { cancel, handle }) = self.running.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if let Err(e) = handle.await {
            error!(error = %e, "sync loop task failed");
        }
        info!("sync orchestrator stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run one pass now, subject to the single-flight gate.
    pub async fn force_sync_now(&self) -> Result<SyncOutcome, FieldSyncError> {
        self.inner.run_pass().await
    }

    /// Cheap status read for UI polling.
    ///
    /// `pending_count` counts every record the next pass would pick up.
    pub async fn get_status(&self) -> Result<SyncStatusSnapshot, FieldSyncError> {
        let mut pending_count = 0;
        for status in self.inner.eligible_statuses() {
            pending_count += self.inner.queue.count_by_status(status).await?;
        }
        Ok(SyncStatusSnapshot {
            pending_count,
            in_progress: self.inner.in_progress.load(Ordering::Acquire),
            is_online: self.inner.connectivity.is_online(),
        })
    }

    /// Register `callback` to run after every pass with at least one success.
    pub fn on_sync_complete<F>(&self, callback: F) -> Subscription
    where
        F: Fn(SyncOutcome) + Send + Sync + 'static,
    {
        let id = self.inner.subscribers.add(Arc::new(callback));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.inner.subscribers),
        }
    }

    /// Number of registered completion callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl Inner {
    fn eligible_statuses(&self) -> Vec<SyncStatus> {
        if self.config.include_failed {
            vec![SyncStatus::Pending, SyncStatus::Failed]
        } else {
            vec![SyncStatus::Pending]
        }
    }

    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut online_rx = self.connectivity.subscribe();
        let mut was_online = *online_rx.borrow_and_update();

        if was_online {
            match self.has_work().await {
                Ok(true) => self.run_logged("startup").await,
                Ok(false) => debug!("no buffered visits at startup"),
                Err(e) => error!(error = %e, "failed to inspect queue at startup"),
            }
        }

        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.connectivity.is_online() {
                        self.run_logged("timer").await;
                    }
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        warn!("connectivity signal closed, stopping sync loop");
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online && !was_online {
                        info!("connectivity restored");
                        self.run_logged("reconnect").await;
                    }
                    was_online = online;
                }
                _ = cancel.cancelled() => {
                    debug!("sync loop shutting down");
                    break;
                }
            }
        }
    }

    async fn has_work(&self) -> Result<bool, FieldSyncError> {
        for status in self.eligible_statuses() {
            if self.queue.count_by_status(status).await? > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn run_logged(&self, trigger: &'static str) {
        match self.run_pass().await {
            Ok(outcome) if outcome.attempted() > 0 => {
                debug!(trigger, success = outcome.success, failed = outcome.failed, "triggered pass finished");
            }
            Ok(_) => {}
            Err(e) => error!(trigger, error = %e, "sync pass aborted"),
        }
    }

    async fn run_pass(&self) -> Result<SyncOutcome, FieldSyncError> {
        if !self.connectivity.is_online() {
            debug!("offline, skipping sync pass");
            return Ok(SyncOutcome::noop());
        }
        let Some(guard) = PassGuard::acquire(&self.in_progress) else {
            debug!("sync pass already in progress");
            return Ok(SyncOutcome::noop());
        };

        let outcome = self.drain().await?;
        drop(guard);

        if outcome.attempted() > 0 {
            info!(success = outcome.success, failed = outcome.failed, "sync pass complete");
        }
        if outcome.success > 0 {
            self.subscribers.notify(outcome);
        }
        Ok(outcome)
    }

    /// The body of a pass. Storage faults propagate; record failures do not.
    ///
    /// Never recovers `syncing` records: another process sharing the store
    /// may be submitting them right now. Recovery belongs to [`start`].
    ///
    /// [`start`]: SyncOrchestrator::start
    async fn drain(&self) -> Result<SyncOutcome, FieldSyncError> {
        let records = self.snapshot().await?;
        let mut outcome = SyncOutcome::noop();
        if records.is_empty() {
            return Ok(outcome);
        }
        info!(records = records.len(), "sync pass started");

        let delay = self.config.record_delay();
        for (index, record) in records.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.queue.update_status(&record.id, SyncStatus::Syncing, None).await {
                Ok(()) => {}
                Err(FieldSyncError::InvalidTransition { from, .. }) => {
                    debug!(record_id = %record.id, status = %from, "record changed since snapshot, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            }

            match self.delivery.deliver(record).await {
                Ok(remote_id) => {
                    self.queue.update_status(&record.id, SyncStatus::Synced, None).await?;
                    self.queue.delete(&record.id).await?;
                    info!(record_id = %record.id, remote_id = %remote_id, "visit synced");
                    outcome.success += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        record_id = %record.id,
                        retry_count = record.retry_count + 1,
                        error = %message,
                        "visit sync failed"
                    );
                    self.queue
                        .update_status(&record.id, SyncStatus::Failed, Some(&message))
                        .await?;
                    self.abandon_if_exhausted(&record.id).await?;
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Pending (and failed, if configured) records in processing order.
    async fn snapshot(&self) -> Result<Vec<BufferedVisit>, FieldSyncError> {
        let mut records = Vec::new();
        for status in self.eligible_statuses() {
            records.extend(self.queue.list_by_status(status).await?);
        }
        if self.config.fifo {
            // Stable: same-millisecond captures keep the store's insertion order.
            records.sort_by_key(|r| r.enqueued_at);
        }
        Ok(records)
    }

    async fn abandon_if_exhausted(&self, id: &str) -> Result<(), FieldSyncError> {
        let Some(max_retries) = self.config.max_retries else {
            return Ok(());
        };
        let Some(record) = self.queue.get(id).await? else {
            return Ok(());
        };
        if record.sync_status == SyncStatus::Failed && record.retry_count >= max_retries {
            self.queue.update_status(id, SyncStatus::Abandoned, None).await?;
            warn!(record_id = %id, retry_count = record.retry_count, "visit abandoned after retry ceiling");
        }
        Ok(())
    }
}
