// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldsync status` and `fieldsync list` command implementations.
//!
//! Both read the local queue only; neither needs the backend.

use fieldsync_config::FieldSyncConfig;
use fieldsync_core::{BufferedVisit, FieldSyncError, PluginAdapter, SyncStatus, VisitQueue};
use serde::Serialize;

use crate::app;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub pending: u64,
    pub syncing: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub total: u64,
}

/// One row of `--json` list output.
#[derive(Debug, Serialize)]
pub struct ListEntry {
    pub id: String,
    pub status: String,
    pub retry_count: u32,
    pub enqueued_at: String,
    pub customer_name: String,
    pub has_attachment: bool,
    pub last_error: Option<String>,
}

impl From<&BufferedVisit> for ListEntry {
    fn from(record: &BufferedVisit) -> Self {
        Self {
            id: record.id.clone(),
            status: record.sync_status.to_string(),
            retry_count: record.retry_count,
            enqueued_at: format_millis(record.enqueued_at),
            customer_name: record.payload.customer_name.clone(),
            has_attachment: record.payload.attachment.is_some(),
            last_error: record.last_error.clone(),
        }
    }
}

/// Run the `fieldsync status` command.
pub async fn run_status(config: &FieldSyncConfig, json: bool) -> Result<(), FieldSyncError> {
    let queue = app::open_queue(config).await?;
    let status = StatusResponse {
        database_path: config.storage.database_path.clone(),
        pending: queue.count_by_status(SyncStatus::Pending).await?,
        syncing: queue.count_by_status(SyncStatus::Syncing).await?,
        failed: queue.count_by_status(SyncStatus::Failed).await?,
        abandoned: queue.count_by_status(SyncStatus::Abandoned).await?,
        total: crate::ops::count_all(queue.as_ref()).await?,
    };
    queue.shutdown().await?;

    if json {
        println!("{}", to_json(&status)?);
    } else {
        print!("{}", format_status(&status));
    }
    Ok(())
}

/// Run the `fieldsync list` command.
pub async fn run_list(config: &FieldSyncConfig, json: bool) -> Result<(), FieldSyncError> {
    let queue = app::open_queue(config).await?;
    let records = queue.list_all().await?;
    queue.shutdown().await?;

    if json {
        let entries: Vec<ListEntry> = records.iter().map(ListEntry::from).collect();
        println!("{}", to_json(&entries)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("no buffered visits");
        return Ok(());
    }
    for record in &records {
        println!("{}", format_record_line(record));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, FieldSyncError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FieldSyncError::Internal(format!("failed to serialize output: {e}")))
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| millis.to_string())
}

fn format_status(status: &StatusResponse) -> String {
    format!(
        "queue:     {}\n\
         pending:   {}\n\
         syncing:   {}\n\
         failed:    {}\n\
         abandoned: {}\n\
         total:     {}\n",
        status.database_path,
        status.pending,
        status.syncing,
        status.failed,
        status.abandoned,
        status.total
    )
}

fn format_record_line(record: &BufferedVisit) -> String {
    let mut line = format!(
        "{}  {:<9}  retries={}  {}  {}",
        record.id,
        record.sync_status.to_string(),
        record.retry_count,
        format_millis(record.enqueued_at),
        record.payload.customer_name
    );
    if record.payload.attachment.is_some() {
        line.push_str("  [photo]");
    }
    if let Some(error) = &record.last_error {
        line.push_str(&format!("  last_error={error}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_core::{GeoPoint, VisitPayload};

    fn record(status: SyncStatus, last_error: Option<&str>) -> BufferedVisit {
        BufferedVisit {
            id: "abc".into(),
            payload: VisitPayload {
                customer_name: "Acme".into(),
                customer_phone: "+1".into(),
                customer_id: None,
                meeting_types: vec![],
                product_ids: vec![],
                notes: None,
                location: GeoPoint {
                    latitude: 0.0,
                    longitude: 0.0,
                    accuracy_m: None,
                },
                actor_phone: "+2".into(),
                attachment: None,
            },
            enqueued_at: 1_767_225_600_000,
            sync_status: status,
            retry_count: 2,
            last_error: last_error.map(str::to_string),
        }
    }

    #[test]
    fn record_line_includes_error() {
        let line = format_record_line(&record(SyncStatus::Failed, Some("boom")));
        assert!(line.starts_with("abc  failed"));
        assert!(line.contains("retries=2"));
        assert!(line.contains("2026-01-01T00:00:00Z"));
        assert!(line.ends_with("last_error=boom"));
    }

    #[test]
    fn list_entry_from_record() {
        let entry = ListEntry::from(&record(SyncStatus::Abandoned, None));
        assert_eq!(entry.status, "abandoned");
        assert!(!entry.has_attachment);
        assert!(entry.last_error.is_none());
    }

    #[test]
    fn status_text_lists_every_count() {
        let text = format_status(&StatusResponse {
            database_path: "/tmp/q.db".into(),
            pending: 3,
            syncing: 0,
            failed: 1,
            abandoned: 0,
            total: 4,
        });
        assert!(text.contains("pending:   3"));
        assert!(text.contains("total:     4"));
    }
}
