// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the fieldsync workspace.

use thiserror::Error;

use crate::types::SyncStatus;

/// The primary error type used across all fieldsync collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum FieldSyncError {
    /// Configuration errors (invalid TOML, missing required fields, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local store errors (cannot open, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A status change that the record lifecycle does not allow.
    #[error("record {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: SyncStatus,
        to: SyncStatus,
    },

    /// The actor's phone attribute did not resolve to a remote identity.
    #[error("no remote actor found for phone {phone}")]
    IdentityNotFound { phone: String },

    /// The remote backend rejected a request or could not be reached.
    #[error("remote error: {message}")]
    Remote {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An attachment could not be converted into its transferable form.
    #[error("attachment error: {0}")]
    Attachment(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FieldSyncError {
    /// Wraps any error as a storage fault.
    pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(e),
        }
    }

    /// Builds a remote error without an underlying source.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            source: None,
        }
    }
}
