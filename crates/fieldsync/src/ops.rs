// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator commands: `sync`, `enqueue`, `requeue`, `clear`.

use std::path::Path;

use fieldsync_config::FieldSyncConfig;
use fieldsync_core::{
    Attachment, Connectivity, FieldSyncError, PluginAdapter, SyncOutcome, SyncStatus,
    VisitPayload, VisitQueue,
};
use fieldsync_sync::{CaptureService, Captured, SyncOrchestrator};
use tracing::info;

use crate::app::{self, Remote};

/// Run one forced pass against the configured backend.
pub async fn run_sync(config: &FieldSyncConfig) -> Result<SyncOutcome, FieldSyncError> {
    let queue = app::open_queue(config).await?;
    let remote = Remote::from_config(config)?;
    let _owner = app::recover_if_owner(config, queue.as_ref()).await?;

    let connectivity = Connectivity::new(false);
    if !remote.probe.check(&connectivity).await {
        println!("backend unreachable; nothing sent");
    }

    let orchestrator = SyncOrchestrator::new(
        queue.clone(),
        remote.delivery(config),
        connectivity,
        config.sync.clone(),
    );
    let outcome = orchestrator.force_sync_now().await?;
    queue.shutdown().await?;

    println!("synced {}, failed {}", outcome.success, outcome.failed);
    Ok(outcome)
}

/// Capture a visit from a JSON file, optionally with a photo.
///
/// With a configured backend this goes through the capture path (direct
/// write when reachable); otherwise the visit is buffered.
pub async fn run_enqueue(
    config: &FieldSyncConfig,
    file: &Path,
    image: Option<&Path>,
) -> Result<Captured, FieldSyncError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| FieldSyncError::Config(format!("cannot read {}: {e}", file.display())))?;
    let mut payload = parse_payload(&content, config.agent.phone.as_deref())?;

    if let Some(path) = image {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FieldSyncError::Attachment(format!("cannot read {}: {e}", path.display())))?;
        payload.attachment = Some(Attachment {
            bytes,
            mime_type: mime_for(path).to_string(),
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        });
    }

    let queue = app::open_queue(config).await?;
    let captured = if Remote::is_configured(config) {
        let remote = Remote::from_config(config)?;
        let connectivity = Connectivity::new(false);
        remote.probe.check(&connectivity).await;
        CaptureService::new(queue.clone(), remote.delivery(config), connectivity)
            .capture(payload)
            .await?
    } else {
        Captured::Buffered(queue.insert(&payload).await?)
    };
    queue.shutdown().await?;

    match &captured {
        Captured::Submitted(remote_id) => println!("submitted as {remote_id}"),
        Captured::Buffered(id) => println!("buffered as {id}"),
    }
    Ok(captured)
}

/// Move an abandoned record back to `pending`.
pub async fn run_requeue(config: &FieldSyncConfig, id: &str) -> Result<(), FieldSyncError> {
    let queue = app::open_queue(config).await?;
    let result = requeue(queue.as_ref(), id).await;
    queue.shutdown().await?;
    result?;
    println!("requeued {id}");
    Ok(())
}

/// Wipe the queue. Refuses without explicit confirmation.
pub async fn run_clear(config: &FieldSyncConfig, confirmed: bool) -> Result<u64, FieldSyncError> {
    if !confirmed {
        return Err(FieldSyncError::Config(
            "refusing to clear the queue without --yes".into(),
        ));
    }
    let queue = app::open_queue(config).await?;
    let removed = count_all(queue.as_ref()).await?;
    queue.clear().await?;
    queue.shutdown().await?;
    info!(removed, "queue cleared");
    println!("removed {removed} buffered visits");
    Ok(removed)
}

/// Records held in any status, counted without loading payloads.
pub(crate) async fn count_all(queue: &dyn VisitQueue) -> Result<u64, FieldSyncError> {
    let mut total = 0;
    for status in SyncStatus::ALL {
        total += queue.count_by_status(status).await?;
    }
    Ok(total)
}

pub(crate) async fn requeue(queue: &dyn VisitQueue, id: &str) -> Result<(), FieldSyncError> {
    if queue.get(id).await?.is_none() {
        return Err(FieldSyncError::Internal(format!("no buffered visit with id {id}")));
    }
    queue.update_status(id, SyncStatus::Pending, None).await?;
    info!(record_id = %id, "visit requeued");
    Ok(())
}

/// Parse a visit file, filling `actor_phone` from config when the file omits it.
pub(crate) fn parse_payload(
    content: &str,
    default_phone: Option<&str>,
) -> Result<VisitPayload, FieldSyncError> {
    let mut value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| FieldSyncError::Config(format!("invalid visit file: {e}")))?;

    if let (Some(object), Some(phone)) = (value.as_object_mut(), default_phone) {
        object
            .entry("actor_phone")
            .or_insert_with(|| serde_json::Value::String(phone.to_string()));
    }

    serde_json::from_value(value).map_err(|e| {
        FieldSyncError::Config(format!(
            "invalid visit file: {e} (set agent.phone to supply a default actor_phone)"
        ))
    })
}

/// Image mime type from the file extension.
pub(crate) fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_test_utils::{visit_payload, MemoryVisitQueue};

    const VISIT: &str = r#"{
        "customer_name": "Acme Traders",
        "customer_phone": "+15550100",
        "meeting_types": ["demo"],
        "location": {"latitude": 12.9, "longitude": 77.6}
    }"#;

    #[test]
    fn parse_fills_actor_phone_from_config() {
        let payload = parse_payload(VISIT, Some("+15550999")).unwrap();
        assert_eq!(payload.actor_phone, "+15550999");
        assert_eq!(payload.meeting_types, vec!["demo".to_string()]);
        assert!(payload.product_ids.is_empty());
    }

    #[test]
    fn parse_keeps_explicit_actor_phone() {
        let content = VISIT.replace("\"meeting_types\"", "\"actor_phone\": \"+1777\", \"meeting_types\"");
        let payload = parse_payload(&content, Some("+15550999")).unwrap();
        assert_eq!(payload.actor_phone, "+1777");
    }

    #[test]
    fn parse_without_any_phone_fails() {
        let err = parse_payload(VISIT, None).unwrap_err();
        assert!(err.to_string().contains("actor_phone"), "got: {err}");
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for(Path::new("a/b/shelf.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("x.png")), "image/png");
        assert_eq!(mime_for(Path::new("notes.txt")), "application/octet-stream");
    }

    #[tokio::test]
    async fn requeue_only_moves_abandoned() {
        let queue = MemoryVisitQueue::new();
        let id = queue.insert(&visit_payload("A")).await.unwrap();

        assert!(matches!(
            requeue(&queue, &id).await,
            Err(FieldSyncError::InvalidTransition { .. })
        ));

        queue.update_status(&id, SyncStatus::Syncing, None).await.unwrap();
        queue.update_status(&id, SyncStatus::Failed, Some("x")).await.unwrap();
        queue.update_status(&id, SyncStatus::Abandoned, None).await.unwrap();
        requeue(&queue, &id).await.unwrap();

        let record = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Pending);
        assert_eq!(record.retry_count, 1);
    }

    #[tokio::test]
    async fn count_all_spans_every_status() {
        let queue = MemoryVisitQueue::new();
        let failed = queue.insert(&visit_payload("A")).await.unwrap();
        queue.insert(&visit_payload("B")).await.unwrap();
        queue.update_status(&failed, SyncStatus::Syncing, None).await.unwrap();
        queue.update_status(&failed, SyncStatus::Failed, Some("x")).await.unwrap();

        assert_eq!(count_all(&queue).await.unwrap(), 2);
        queue.clear().await.unwrap();
        assert_eq!(count_all(&queue).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn requeue_unknown_id_is_an_error() {
        let queue = MemoryVisitQueue::new();
        assert!(requeue(&queue, "missing").await.is_err());
    }
}
