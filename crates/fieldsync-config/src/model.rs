// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for fieldsync.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level fieldsync configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSyncConfig {
    /// Field agent identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Local queue storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync orchestrator timing and retry policy.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Hosted backend settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Attachment encoding limits.
    #[serde(default)]
    pub attachment: AttachmentConfig,
}

/// Field agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Phone attribute of the capturing agent, stamped on visits enqueued from the CLI.
    #[serde(default)]
    pub phone: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            phone: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Local queue storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("fieldsync").join("queue.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("fieldsync-queue.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Sync orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Seconds between periodic passes while online.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Pause between records within a pass, in milliseconds.
    #[serde(default = "default_record_delay_ms")]
    pub record_delay_ms: u64,

    /// Upper bound on resolving and submitting one record. `0` disables the bound.
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    /// Whether a pass retries `failed` records alongside `pending` ones.
    #[serde(default = "default_true")]
    pub include_failed: bool,

    /// Process records oldest-first by capture time.
    #[serde(default = "default_true")]
    pub fifo: bool,

    /// Failed attempts after which a record is abandoned. Unset keeps retrying forever.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            record_delay_ms: default_record_delay_ms(),
            submit_timeout_secs: default_submit_timeout_secs(),
            include_failed: true,
            fifo: true,
            max_retries: None,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn record_delay(&self) -> Duration {
        Duration::from_millis(self.record_delay_ms)
    }

    /// `None` when the per-record bound is disabled.
    pub fn submit_timeout(&self) -> Option<Duration> {
        (self.submit_timeout_secs > 0).then(|| Duration::from_secs(self.submit_timeout_secs))
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_record_delay_ms() -> u64 {
    500
}

fn default_submit_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Hosted backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the REST backend, e.g. `https://project.example.co`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key sent as both `apikey` and bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Tenant (company) every visit is scoped to.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Path probed to decide whether the backend is reachable.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Seconds between connectivity probes.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            tenant_id: None,
            health_path: default_health_path(),
            probe_interval_secs: default_probe_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_probe_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Attachment encoding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentConfig {
    /// Largest attachment, in bytes, that is encoded and sent.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.record_delay(), Duration::from_millis(500));
        assert_eq!(config.submit_timeout(), Some(Duration::from_secs(30)));
        assert!(config.include_failed);
        assert!(config.fifo);
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn zero_submit_timeout_disables_bound() {
        let config = SyncConfig {
            submit_timeout_secs: 0,
            ..SyncConfig::default()
        };
        assert!(config.submit_timeout().is_none());
    }

    #[test]
    fn default_database_path_ends_with_queue_db() {
        let config = StorageConfig::default();
        assert!(config.database_path.ends_with("queue.db"));
        assert!(config.wal_mode);
    }

    #[test]
    fn remote_defaults() {
        let config = RemoteConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.health_path, "/health");
        assert_eq!(config.probe_interval_secs, 10);
    }
}
