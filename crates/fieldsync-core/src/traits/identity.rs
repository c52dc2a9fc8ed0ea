// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolver trait.

use async_trait::async_trait;

use crate::error::FieldSyncError;
use crate::traits::adapter::PluginAdapter;

/// Maps a locally known phone attribute to the remote actor identity.
#[async_trait]
pub trait IdentityResolver: PluginAdapter {
    /// Returns the remote actor id, or `None` when no actor matches within `tenant`.
    async fn resolve(&self, phone: &str, tenant: &str) -> Result<Option<String>, FieldSyncError>;
}
