// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive intervals, and well-formed URLs.

use crate::diagnostic::ConfigError;
use crate::model::FieldSyncConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FieldSyncConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{}` must be one of {}",
                config.agent.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.sync.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.interval_secs must be at least 1".to_string(),
        });
    }

    if config.sync.max_retries == Some(0) {
        errors.push(ConfigError::Validation {
            message: "sync.max_retries must be at least 1 when set".to_string(),
        });
    }

    if let Some(url) = &config.remote.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("remote.base_url `{url}` must start with http:// or https://"),
        });
    }

    if !config.remote.health_path.starts_with('/') {
        errors.push(ConfigError::Validation {
            message: format!(
                "remote.health_path `{}` must start with `/`",
                config.remote.health_path
            ),
        });
    }

    if config.remote.probe_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "remote.probe_interval_secs must be at least 1".to_string(),
        });
    }

    if config.attachment.max_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "attachment.max_bytes must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the `[remote]` keys that talking to the backend requires.
///
/// Local-only commands (status, list, clear) run without them.
pub fn require_remote(config: &FieldSyncConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    if config.remote.base_url.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "remote.base_url".to_string(),
        });
    }
    if config.remote.tenant_id.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "remote.tenant_id".to_string(),
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
