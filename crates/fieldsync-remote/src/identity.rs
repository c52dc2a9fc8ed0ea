// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Actor lookup by phone number.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use fieldsync_core::{AdapterType, FieldSyncError, HealthStatus, IdentityResolver, PluginAdapter};

use crate::client::RestClient;

const USERS_PATH: &str = "/rest/v1/users";

#[derive(Debug, Deserialize)]
struct UserRow {
    id: serde_json::Value,
}

/// Resolves a field agent's phone number to the backend `users.id`, scoped
/// to the tenant's `company_id`.
#[derive(Debug, Clone)]
pub struct HttpIdentityResolver {
    client: RestClient,
}

impl HttpIdentityResolver {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for HttpIdentityResolver {
    fn name(&self) -> &str {
        "rest-identity"
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
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, phone: &str, tenant: &str) -> Result<Option<String>, FieldSyncError> {
        let phone_filter = format!("eq.{phone}");
        let tenant_filter = format!("eq.{tenant}");
        let rows: Vec<UserRow> = self
            .client
            .get_json(
                USERS_PATH,
                &[
                    ("phone", phone_filter.as_str()),
                    ("company_id", tenant_filter.as_str()),
                    ("select", "id"),
                    ("limit", "1"),
                ],
            )
            .await?;

        let id = rows.into_iter().next().map(|row| match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        debug!(found = id.is_some(), "actor lookup complete");
        Ok(id)
    }
}
