// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the VisitQueue trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use fieldsync_config::model::StorageConfig;
use fieldsync_core::{
    AdapterType, BufferedVisit, Clock, FieldSyncError, HealthStatus, PluginAdapter, SyncStatus,
    SystemClock, VisitPayload, VisitQueue,
};

use crate::database::{map_tr_err, Database};
use crate::queries::visits;

/// SQLite-backed durable visit queue.
///
/// Wraps a [`Database`] handle and delegates all query operations to
/// [`visits`]. The database is opened by [`initialize`](Self::initialize);
/// every queue operation fails with a storage error until then.
pub struct SqliteVisitQueue {
    config: StorageConfig,
    db: OnceCell<Database>,
    clock: Arc<dyn Clock>,
}

impl SqliteVisitQueue {
    /// Create a queue with the given configuration and the system clock.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a queue that stamps `enqueued_at` from `clock`.
    pub fn with_clock(config: StorageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            clock,
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, FieldSyncError> {
        let queue = Self::new(config);
        queue.initialize().await?;
        Ok(queue)
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), FieldSyncError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| FieldSyncError::Internal("queue already initialized".into()))?;
        debug!(path = %self.config.database_path, "visit queue initialized");
        Ok(())
    }

    /// Checkpoint the WAL so the database file is self-contained.
    pub async fn close(&self) -> Result<(), FieldSyncError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    fn db(&self) -> Result<&Database, FieldSyncError> {
        self.db.get().ok_or_else(|| {
            FieldSyncError::storage(std::io::Error::other(
                "visit queue not initialized -- call initialize() first",
            ))
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteVisitQueue {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldSyncError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldSyncError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VisitQueue for SqliteVisitQueue {
    async fn insert(&self, payload: &VisitPayload) -> Result<String, FieldSyncError> {
        let db = self.db()?;
        let id = uuid::Uuid::new_v4().to_string();
        visits::insert(db, &id, payload, self.clock.now_millis()).await?;
        debug!(record_id = %id, "visit buffered");
        Ok(id)
    }

    async fn insert_with(
        &self,
        id: &str,
        enqueued_at: i64,
        payload: &VisitPayload,
    ) -> Result<(), FieldSyncError> {
        visits::insert(self.db()?, id, payload, enqueued_at).await?;
        debug!(record_id = %id, "visit buffered");
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: SyncStatus,
    ) -> Result<Vec<BufferedVisit>, FieldSyncError> {
        visits::list_by_status(self.db()?, status).await
    }

    async fn list_all(&self) -> Result<Vec<BufferedVisit>, FieldSyncError> {
        visits::list_all(self.db()?).await
    }

    async fn get(&self, id: &str) -> Result<Option<BufferedVisit>, FieldSyncError> {
        visits::get(self.db()?, id).await
    }

    async fn update_status(
        &self,
        id: &str,
        status: SyncStatus,
        error: Option<&str>,
    ) -> Result<(), FieldSyncError> {
        visits::update_status(self.db()?, id, status, error).await
    }

    async fn delete(&self, id: &str) -> Result<(), FieldSyncError> {
        visits::delete(self.db()?, id).await
    }

    async fn count_by_status(&self, status: SyncStatus) -> Result<u64, FieldSyncError> {
        visits::count_by_status(self.db()?, status).await
    }

    async fn clear(&self) -> Result<(), FieldSyncError> {
        visits::clear(self.db()?).await
    }
}
