// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory ownership lock for a queue database.
//!
//! Only the holder of `<database>.lock` may run crash recovery, because
//! recovery turns every `syncing` record into `failed` and would otherwise
//! hand another process's in-flight record to a second pass. The OS drops
//! the lock when the holder exits, so a crashed daemon never leaves it stale.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fieldsync_core::FieldSyncError;
use fs2::FileExt;
use tracing::debug;

/// Held for as long as this process owns recovery of the queue.
#[derive(Debug)]
pub struct StoreLock {
    // Unlocked when the file is closed on drop.
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock for the queue at `database_path`.
    ///
    /// Returns `Ok(None)` when another process (or another handle in this
    /// one) already holds it.
    pub fn try_acquire(database_path: &str) -> Result<Option<Self>, FieldSyncError> {
        let path = lock_path_for(database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(FieldSyncError::storage)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(FieldSyncError::storage)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "queue lock acquired");
                Ok(Some(Self { _file: file, path }))
            }
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                debug!(path = %path.display(), "queue lock held elsewhere");
                Ok(None)
            }
            Err(e) => Err(FieldSyncError::storage(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path_for(database_path: &str) -> PathBuf {
    PathBuf::from(format!("{database_path}.lock"))
}
