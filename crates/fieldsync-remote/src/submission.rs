// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visit creation against the backend `visits` table.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use fieldsync_core::{
    AdapterType, CanonicalVisit, FieldSyncError, HealthStatus, PluginAdapter, SubmissionAdapter,
};

use crate::client::RestClient;

const VISITS_PATH: &str = "/rest/v1/visits";

#[derive(Debug, Deserialize)]
struct CreatedRow {
    id: serde_json::Value,
}

/// Inserts canonical visits and returns the backend's id for the new row.
#[derive(Debug, Clone)]
pub struct HttpSubmissionAdapter {
    client: RestClient,
}

impl HttpSubmissionAdapter {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for HttpSubmissionAdapter {
    fn name(&self) -> &str {
        "rest-visits"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Submission
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldSyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldSyncError> {
        Ok(())
    }
}

#[async_trait]
impl SubmissionAdapter for HttpSubmissionAdapter {
    async fn create(&self, tenant: &str, visit: &CanonicalVisit) -> Result<String, FieldSyncError> {
        if visit.company_id != tenant {
            return Err(FieldSyncError::Internal(format!(
                "visit scoped to {} submitted under tenant {tenant}",
                visit.company_id
            )));
        }

        let rows: Vec<CreatedRow> = self.client.post_json(VISITS_PATH, visit).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| FieldSyncError::remote("backend accepted the visit but returned no row"))?;

        let remote_id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        info!(remote_id = %remote_id, client_ref = %visit.client_ref, "visit created");
        Ok(remote_id)
    }
}
