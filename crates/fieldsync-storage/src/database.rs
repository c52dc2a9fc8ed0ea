// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! [`Database`] is the single writer: every query function takes `&Database`
//! and goes through `connection().call()`, so the capture path and the
//! orchestrator never interleave inside a statement. Do NOT create additional
//! Connection instances for writes. Cross-process ownership of recovery is
//! the job of [`StoreLock`](crate::StoreLock).

use std::path::Path;
use std::time::Duration;

use fieldsync_core::FieldSyncError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into FieldSyncError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> FieldSyncError {
    FieldSyncError::storage(e)
}

/// Handle to the queue database. This is the single writer.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, FieldSyncError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode.
    ///
    /// `synchronous = FULL` is used in both modes: an insert is the commit
    /// point for a captured visit and must survive power loss.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, FieldSyncError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(FieldSyncError::storage)?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(FieldSyncError::storage)?;

        let journal = if wal_mode { "WAL" } else { "DELETE" };
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", journal, |row| row.get(0))?;
            conn.pragma_update(None, "synchronous", "FULL")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(FieldSyncError::storage)?;

        debug!(path, journal, "queue database opened");
        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), FieldSyncError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(FieldSyncError::storage)
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), FieldSyncError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
