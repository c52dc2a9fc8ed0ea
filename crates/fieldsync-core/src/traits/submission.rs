// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote submission adapter trait.

use async_trait::async_trait;

use crate::error::FieldSyncError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CanonicalVisit;

/// Persists canonical visits in the remote system.
#[async_trait]
pub trait SubmissionAdapter: PluginAdapter {
    /// Create the visit under `tenant`; returns the remote record id.
    async fn create(&self, tenant: &str, visit: &CanonicalVisit) -> Result<String, FieldSyncError>;
}
