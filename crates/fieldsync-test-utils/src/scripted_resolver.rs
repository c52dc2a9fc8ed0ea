// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolver with scripted misses.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use fieldsync_core::{AdapterType, FieldSyncError, HealthStatus, IdentityResolver, PluginAdapter};

/// Resolves every phone to `user-<phone>` unless told otherwise.
#[derive(Default)]
pub struct ScriptedResolver {
    unknown: Mutex<HashSet<String>>,
    unreachable: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `phone` resolve to no actor.
    pub fn unknown(&self, phone: &str) {
        self.unknown
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(phone.to_string());
    }

    /// When `true`, every lookup fails with a remote error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for ScriptedResolver {
    fn name(&self) -> &str {
        "scripted-resolver"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::IdentityResolver
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldSyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldSyncError> {
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for ScriptedResolver {
    async fn resolve(&self, phone: &str, _tenant: &str) -> Result<Option<String>, FieldSyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(FieldSyncError::remote("scripted resolver unreachable"));
        }
        let unknown = self
            .unknown
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(phone);
        Ok((!unknown).then(|| format!("user-{phone}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_unless_scripted_unknown() {
        let resolver = ScriptedResolver::new();
        assert_eq!(
            resolver.resolve("+1", "t").await.unwrap().as_deref(),
            Some("user-+1")
        );
        resolver.unknown("+1");
        assert!(resolver.resolve("+1", "t").await.unwrap().is_none());
        resolver.set_unreachable(true);
        assert!(resolver.resolve("+2", "t").await.is_err());
        assert_eq!(resolver.call_count(), 3);
    }
}
