// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of concrete collaborators from configuration.

use std::sync::Arc;
use std::time::Duration;

use fieldsync_config::FieldSyncConfig;
use fieldsync_core::{FieldSyncError, VisitQueue};
use fieldsync_remote::{ConnectivityProbe, HttpIdentityResolver, HttpSubmissionAdapter, RestClient};
use fieldsync_storage::{SqliteVisitQueue, StoreLock};
use fieldsync_sync::{AttachmentEncoder, Delivery};
use tracing::info;

/// Open the SQLite queue at the configured path.
pub async fn open_queue(config: &FieldSyncConfig) -> Result<Arc<SqliteVisitQueue>, FieldSyncError> {
    Ok(Arc::new(SqliteVisitQueue::open(config.storage.clone()).await?))
}

/// Take ownership of the queue for a long-running daemon.
pub fn claim_queue(config: &FieldSyncConfig) -> Result<StoreLock, FieldSyncError> {
    StoreLock::try_acquire(&config.storage.database_path)?.ok_or_else(|| {
        FieldSyncError::Config(format!(
            "another fieldsync process owns the queue at {}",
            config.storage.database_path
        ))
    })
}

/// Run crash recovery only if no other process owns the queue.
///
/// Keep the returned lock alive until done with the queue. `None` means a
/// daemon is running and its `syncing` records are left alone.
pub async fn recover_if_owner(
    config: &FieldSyncConfig,
    queue: &dyn VisitQueue,
) -> Result<Option<StoreLock>, FieldSyncError> {
    let Some(lock) = StoreLock::try_acquire(&config.storage.database_path)? else {
        info!("queue owned by a running daemon, skipping recovery");
        return Ok(None);
    };
    let report = queue.recover().await?;
    info!(
        purged = report.purged,
        interrupted = report.interrupted,
        "queue recovered"
    );
    Ok(Some(lock))
}

/// HTTP collaborators for the configured backend.
pub struct Remote {
    pub resolver: Arc<HttpIdentityResolver>,
    pub submitter: Arc<HttpSubmissionAdapter>,
    pub probe: ConnectivityProbe,
    tenant: String,
}

impl Remote {
    pub fn from_config(config: &FieldSyncConfig) -> Result<Self, FieldSyncError> {
        let client = RestClient::new(&config.remote)?;
        let tenant = config
            .remote
            .tenant_id
            .clone()
            .ok_or_else(|| FieldSyncError::Config("remote.tenant_id is not set".into()))?;
        let probe = ConnectivityProbe::new(
            client.clone(),
            config.remote.health_path.clone(),
            Duration::from_secs(config.remote.probe_interval_secs),
        );
        Ok(Self {
            resolver: Arc::new(HttpIdentityResolver::new(client.clone())),
            submitter: Arc::new(HttpSubmissionAdapter::new(client)),
            probe,
            tenant,
        })
    }

    /// Whether enough of `[remote]` is set to talk to a backend.
    pub fn is_configured(config: &FieldSyncConfig) -> bool {
        config.remote.base_url.is_some() && config.remote.tenant_id.is_some()
    }

    pub fn delivery(&self, config: &FieldSyncConfig) -> Delivery {
        Delivery::new(self.resolver.clone(), self.submitter.clone(), self.tenant.clone())
            .with_encoder(AttachmentEncoder::from_config(&config.attachment))
            .with_timeout(config.sync.submit_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_core::{PluginAdapter, SyncStatus, INTERRUPTED_ERROR};
    use fieldsync_test_utils::visit_payload;
    use tempfile::tempdir;

    fn config_at(path: &std::path::Path) -> FieldSyncConfig {
        let mut config = FieldSyncConfig::default();
        config.storage.database_path = path.to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn one_shot_recovery_waits_for_daemon_to_release_queue() {
        let dir = tempdir().unwrap();
        let config = config_at(&dir.path().join("queue.db"));
        let queue = open_queue(&config).await.unwrap();
        let id = queue.insert(&visit_payload("A")).await.unwrap();
        queue.update_status(&id, SyncStatus::Syncing, None).await.unwrap();

        let daemon = claim_queue(&config).unwrap();
        assert!(claim_queue(&config).is_err());
        assert!(recover_if_owner(&config, queue.as_ref()).await.unwrap().is_none());
        assert_eq!(
            queue.get(&id).await.unwrap().unwrap().sync_status,
            SyncStatus::Syncing
        );

        drop(daemon);
        let lock = recover_if_owner(&config, queue.as_ref()).await.unwrap();
        assert!(lock.is_some());
        let record = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some(INTERRUPTED_ERROR));
        queue.shutdown().await.unwrap();
    }
}
