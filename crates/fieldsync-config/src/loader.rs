// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./fieldsync.toml` > `~/.config/fieldsync/fieldsync.toml` > `/etc/fieldsync/fieldsync.toml`
//! with environment variable overrides via `FIELDSYNC_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FieldSyncConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fieldsync/fieldsync.toml` (system-wide)
/// 3. `~/.config/fieldsync/fieldsync.toml` (user XDG config)
/// 4. `./fieldsync.toml` (local directory)
/// 5. `FIELDSYNC_*` environment variables
pub fn load_config() -> Result<FieldSyncConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FieldSyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldSyncConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FieldSyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldSyncConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FieldSyncConfig::default()))
        .merge(Toml::file("/etc/fieldsync/fieldsync.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("fieldsync/fieldsync.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("fieldsync.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config key.
///
/// Only the first underscore after a known section becomes a dot, so
/// `FIELDSYNC_SYNC_MAX_RETRIES` maps to `sync.max_retries`, not `sync.max.retries`.
pub fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["agent", "storage", "sync", "remote", "attachment"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
fn env_provider() -> Env {
    Env::prefixed("FIELDSYNC_").map(|key| map_env_key(key.as_str()).into())
}
