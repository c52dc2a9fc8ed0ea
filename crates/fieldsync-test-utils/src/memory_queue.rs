// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory visit queue for deterministic testing.
//!
//! `MemoryVisitQueue` implements `VisitQueue` over a `Vec` kept in insertion
//! order, enforcing the same status transitions and retry bookkeeping as the
//! SQLite queue. It can be switched "unavailable" to simulate storage faults.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use fieldsync_core::{
    AdapterType, BufferedVisit, Clock, FieldSyncError, HealthStatus, PluginAdapter, SyncStatus,
    SystemClock, VisitPayload, VisitQueue,
};

/// A queue that lives only as long as the test.
pub struct MemoryVisitQueue {
    records: Mutex<Vec<BufferedVisit>>,
    next_id: AtomicU64,
    last_enqueued: AtomicI64,
    available: AtomicBool,
}

impl MemoryVisitQueue {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            last_enqueued: AtomicI64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Insert with an explicit capture time, bypassing availability checks.
    pub fn insert_at(&self, payload: &VisitPayload, enqueued_at: i64) -> String {
        let id = format!("visit-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.records().push(pending(id.clone(), enqueued_at, payload));
        id
    }

    /// When `false`, every queue operation fails with a storage error.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of records currently held, regardless of status.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> MutexGuard<'_, Vec<BufferedVisit>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), FieldSyncError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FieldSyncError::storage(std::io::Error::other(
                "memory queue unavailable",
            )))
        }
    }
}

fn pending(id: String, enqueued_at: i64, payload: &VisitPayload) -> BufferedVisit {
    BufferedVisit {
        id,
        payload: payload.clone(),
        enqueued_at,
        sync_status: SyncStatus::Pending,
        retry_count: 0,
        last_error: None,
    }
}

impl Default for MemoryVisitQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryVisitQueue {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldSyncError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("memory queue unavailable".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), FieldSyncError> {
        Ok(())
    }
}

#[async_trait]
impl VisitQueue for MemoryVisitQueue {
    async fn insert(&self, payload: &VisitPayload) -> Result<String, FieldSyncError> {
        self.check_available()?;
        // Strictly increasing, so capture order survives same-millisecond inserts.
        let now = SystemClock.now_millis();
        let previous = self
            .last_enqueued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        Ok(self.insert_at(payload, now.max(previous + 1)))
    }

    async fn insert_with(
        &self,
        id: &str,
        enqueued_at: i64,
        payload: &VisitPayload,
    ) -> Result<(), FieldSyncError> {
        self.check_available()?;
        let mut records = self.records();
        if records.iter().any(|r| r.id == id) {
            return Err(FieldSyncError::storage(std::io::Error::other(format!(
                "duplicate visit id {id}"
            ))));
        }
        records.push(pending(id.to_string(), enqueued_at, payload));
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: SyncStatus,
    ) -> Result<Vec<BufferedVisit>, FieldSyncError> {
        self.check_available()?;
        Ok(self
            .records()
            .iter()
            .filter(|r| r.sync_status == status)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<BufferedVisit>, FieldSyncError> {
        self.check_available()?;
        Ok(self.records().clone())
    }

    async fn get(&self, id: &str) -> Result<Option<BufferedVisit>, FieldSyncError> {
        self.check_available()?;
        Ok(self.records().iter().find(|r| r.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        status: SyncStatus,
        error: Option<&str>,
    ) -> Result<(), FieldSyncError> {
        self.check_available()?;
        let mut records = self.records();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        if !record.sync_status.can_transition_to(status) {
            return Err(FieldSyncError::InvalidTransition {
                id: id.to_string(),
                from: record.sync_status,
                to: status,
            });
        }
        record.sync_status = status;
        if status == SyncStatus::Failed {
            record.retry_count += 1;
            record.last_error = error.map(str::to_string);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), FieldSyncError> {
        self.check_available()?;
        self.records().retain(|r| r.id != id);
        Ok(())
    }

    async fn count_by_status(&self, status: SyncStatus) -> Result<u64, FieldSyncError> {
        self.check_available()?;
        Ok(self
            .records()
            .iter()
            .filter(|r| r.sync_status == status)
            .count() as u64)
    }

    async fn clear(&self) -> Result<(), FieldSyncError> {
        self.check_available()?;
        self.records().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::visit_payload;

    #[tokio::test]
    async fn mirrors_lifecycle_rules() {
        let queue = MemoryVisitQueue::new();
        let id = queue.insert(&visit_payload("A")).await.unwrap();

        assert!(matches!(
            queue.update_status(&id, SyncStatus::Synced, None).await,
            Err(FieldSyncError::InvalidTransition { .. })
        ));

        queue.update_status(&id, SyncStatus::Syncing, None).await.unwrap();
        queue
            .update_status(&id, SyncStatus::Failed, Some("boom"))
            .await
            .unwrap();
        let record = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn missing_id_update_is_noop() {
        let queue = MemoryVisitQueue::new();
        queue
            .update_status("gone", SyncStatus::Syncing, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unavailable_queue_fails_loudly() {
        let queue = MemoryVisitQueue::new();
        queue.set_available(false);
        assert!(queue.insert(&visit_payload("A")).await.is_err());
        assert!(queue.list_all().await.is_err());
        queue.set_available(true);
        assert!(queue.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_with_rejects_duplicate_ids() {
        let queue = MemoryVisitQueue::new();
        queue.insert_with("direct-1", 42, &visit_payload("A")).await.unwrap();
        assert_eq!(queue.get("direct-1").await.unwrap().unwrap().enqueued_at, 42);
        assert!(matches!(
            queue.insert_with("direct-1", 43, &visit_payload("B")).await,
            Err(FieldSyncError::Storage { .. })
        ));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn insert_keeps_order_and_increasing_times() {
        let queue = MemoryVisitQueue::new();
        let a = queue.insert(&visit_payload("A")).await.unwrap();
        let b = queue.insert(&visit_payload("B")).await.unwrap();
        let all = queue.list_all().await.unwrap();
        assert_eq!(all[0].id, a);
        assert_eq!(all[1].id, b);
        assert!(all[0].enqueued_at < all[1].enqueued_at);
    }
}
