// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable local queue trait.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FieldSyncError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BufferedVisit, SyncStatus, VisitPayload};

/// Error text stored on records found mid-flight after a restart.
pub const INTERRUPTED_ERROR: &str = "interrupted";

/// What [`VisitQueue::recover`] cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// `synced` records deleted outright.
    pub purged: usize,
    /// `syncing` records moved to `failed`.
    pub interrupted: usize,
}

/// Crash-surviving store of buffered visits, indexed by sync status.
///
/// Owns no business logic. Implementations must durably persist on
/// [`insert`](Self::insert) before returning, and must fail loudly when the
/// underlying store is unavailable.
#[async_trait]
pub trait VisitQueue: PluginAdapter {
    /// Store a new `pending` record with `retry_count = 0`; returns its id.
    async fn insert(&self, payload: &VisitPayload) -> Result<String, FieldSyncError>;

    /// Store a new `pending` record under an id and capture time the caller
    /// already chose, e.g. ones sent to the backend by a failed direct write.
    ///
    /// An id that already exists is a storage error.
    async fn insert_with(
        &self,
        id: &str,
        enqueued_at: i64,
        payload: &VisitPayload,
    ) -> Result<(), FieldSyncError>;

    /// All records with the given status, in the store's natural index order.
    async fn list_by_status(&self, status: SyncStatus)
        -> Result<Vec<BufferedVisit>, FieldSyncError>;

    /// Every buffered record regardless of status.
    async fn list_all(&self) -> Result<Vec<BufferedVisit>, FieldSyncError>;

    /// A single record, if it still exists.
    async fn get(&self, id: &str) -> Result<Option<BufferedVisit>, FieldSyncError>;

    /// Move a record to `status`.
    ///
    /// Moving to `failed` also increments `retry_count` and stores `error`.
    /// A missing id is a silent no-op; a transition the lifecycle forbids is
    /// [`FieldSyncError::InvalidTransition`].
    async fn update_status(
        &self,
        id: &str,
        status: SyncStatus,
        error: Option<&str>,
    ) -> Result<(), FieldSyncError>;

    /// Permanently remove a record.
    async fn delete(&self, id: &str) -> Result<(), FieldSyncError>;

    /// Number of records with the given status, without materializing them.
    async fn count_by_status(&self, status: SyncStatus) -> Result<u64, FieldSyncError>;

    /// Remove every record.
    async fn clear(&self) -> Result<(), FieldSyncError>;

    /// Tidy up after an unclean shutdown.
    ///
    /// `synced` records were confirmed remotely and are deleted. `syncing`
    /// records belonged to a pass that never finished and are marked `failed`.
    async fn recover(&self) -> Result<RecoveryReport, FieldSyncError> {
        let mut report = RecoveryReport::default();

        for record in self.list_by_status(SyncStatus::Synced).await? {
            self.delete(&record.id).await?;
            report.purged += 1;
        }

        for record in self.list_by_status(SyncStatus::Syncing).await? {
            warn!(record_id = %record.id, "found record left mid-sync, marking failed");
            self.update_status(&record.id, SyncStatus::Failed, Some(INTERRUPTED_ERROR))
                .await?;
            report.interrupted += 1;
        }

        if report != RecoveryReport::default() {
            debug!(
                purged = report.purged,
                interrupted = report.interrupted,
                "queue recovery complete"
            );
        }
        Ok(report)
    }
}
