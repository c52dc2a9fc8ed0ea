// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Buffered visit queue operations.

use std::str::FromStr;

use fieldsync_core::{Attachment, BufferedVisit, FieldSyncError, SyncStatus, VisitPayload};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};

const COLUMNS: &str = "id, payload, attachment, attachment_mime, attachment_name, \
                       enqueued_at, sync_status, retry_count, last_error";

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn row_to_visit(row: &Row<'_>) -> rusqlite::Result<BufferedVisit> {
    let payload_json: String = row.get(1)?;
    let mut payload: VisitPayload =
        serde_json::from_str(&payload_json).map_err(|e| conversion_err(1, e))?;

    let bytes: Option<Vec<u8>> = row.get(2)?;
    let mime: Option<String> = row.get(3)?;
    let file_name: Option<String> = row.get(4)?;
    payload.attachment = bytes.map(|bytes| Attachment {
        bytes,
        mime_type: mime.unwrap_or_default(),
        file_name,
    });

    let status: String = row.get(6)?;
    Ok(BufferedVisit {
        id: row.get(0)?,
        payload,
        enqueued_at: row.get(5)?,
        sync_status: SyncStatus::from_str(&status).map_err(|e| conversion_err(6, e))?,
        retry_count: row.get(7)?,
        last_error: row.get(8)?,
    })
}

/// Insert a new `pending` record. The payload is committed before this returns.
pub async fn insert(
    db: &Database,
    id: &str,
    payload: &VisitPayload,
    enqueued_at: i64,
) -> Result<(), FieldSyncError> {
    let payload_json = serde_json::to_string(payload).map_err(FieldSyncError::storage)?;
    let id = id.to_string();
    let attachment = payload.attachment.clone();
    db.connection()
        .call(move |conn| {
            let (bytes, mime, name) = match attachment {
                Some(a) => (Some(a.bytes), Some(a.mime_type), a.file_name),
                None => (None, None, None),
            };
            conn.execute(
                "INSERT INTO buffered_visits
                    (id, payload, attachment, attachment_mime, attachment_name, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, payload_json, bytes, mime, name, enqueued_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All records with `status`, in insertion order.
pub async fn list_by_status(
    db: &Database,
    status: SyncStatus,
) -> Result<Vec<BufferedVisit>, FieldSyncError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM buffered_visits WHERE sync_status = ?1 ORDER BY seq ASC"
            ))?;
            let visits = stmt
                .query_map(params![status], row_to_visit)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(visits)
        })
        .await
        .map_err(map_tr_err)
}

/// Every record, in insertion order.
pub async fn list_all(db: &Database) -> Result<Vec<BufferedVisit>, FieldSyncError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM buffered_visits ORDER BY seq ASC"))?;
            let visits = stmt
                .query_map([], row_to_visit)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(visits)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a record by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<BufferedVisit>, FieldSyncError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM buffered_visits WHERE id = ?1"),
                params![id],
                row_to_visit,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Move a record to `status`, validating the transition.
///
/// Moving to `failed` increments `retry_count` and stores `error`; other moves
/// leave both untouched. A missing id is a no-op.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: SyncStatus,
    error: Option<&str>,
) -> Result<(), FieldSyncError> {
    let id = id.to_string();
    let error = error.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let current: Option<String> = tx
                .query_row(
                    "SELECT sync_status FROM buffered_visits WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(Ok(()));
            };
            let from = SyncStatus::from_str(&current).map_err(|e| conversion_err(0, e))?;
            if !from.can_transition_to(status) {
                return Ok(Err(FieldSyncError::InvalidTransition {
                    id,
                    from,
                    to: status,
                }));
            }

            if status == SyncStatus::Failed {
                tx.execute(
                    "UPDATE buffered_visits
                     SET sync_status = ?1, retry_count = retry_count + 1, last_error = ?2,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3",
                    params![status.to_string(), error, id],
                )?;
            } else {
                tx.execute(
                    "UPDATE buffered_visits
                     SET sync_status = ?1,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![status.to_string(), id],
                )?;
            }
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

/// Permanently remove a record.
pub async fn delete(db: &Database, id: &str) -> Result<(), FieldSyncError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM buffered_visits WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count records with `status` without loading them.
pub async fn count_by_status(db: &Database, status: SyncStatus) -> Result<u64, FieldSyncError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM buffered_visits WHERE sync_status = ?1",
                params![status],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}

/// Remove every record.
pub async fn clear(db: &Database) -> Result<(), FieldSyncError> {
    db.connection()
        .call(|conn| {
            conn.execute("DELETE FROM buffered_visits", [])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_core::GeoPoint;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn payload(customer: &str) -> VisitPayload {
        VisitPayload {
            customer_name: customer.to_string(),
            customer_phone: "+15550100".to_string(),
            customer_id: None,
            meeting_types: vec!["demo".to_string()],
            product_ids: vec![],
            notes: Some("left brochure".to_string()),
            location: GeoPoint {
                latitude: 19.07,
                longitude: 72.87,
                accuracy_m: None,
            },
            actor_phone: "+15550999".to_string(),
            attachment: None,
        }
    }

    async fn status_and_retries(db: &Database, id: &str) -> (SyncStatus, u32, Option<String>) {
        let v = get(db, id).await.unwrap().unwrap();
        (v.sync_status, v.retry_count, v.last_error)
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip_with_attachment() {
        let (db, _dir) = setup_db().await;
        let mut p = payload("Acme");
        p.attachment = Some(Attachment {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
            file_name: Some("shopfront.jpg".to_string()),
        });

        insert(&db, "v-1", &p, 1_000).await.unwrap();
        let v = get(&db, "v-1").await.unwrap().unwrap();
        assert_eq!(v.payload, p);
        assert_eq!(v.enqueued_at, 1_000);
        assert_eq!(v.sync_status, SyncStatus::Pending);
        assert_eq!(v.retry_count, 0);
        assert!(v.last_error.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let (db, _dir) = setup_db().await;
        insert(&db, "v-1", &payload("A"), 1).await.unwrap();
        let result = insert(&db, "v-1", &payload("B"), 2).await;
        assert!(matches!(result, Err(FieldSyncError::Storage { .. })));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_by_status_filters_and_keeps_insertion_order() {
        let (db, _dir) = setup_db().await;
        // Capture times deliberately out of order.
        insert(&db, "v-1", &payload("A"), 300).await.unwrap();
        insert(&db, "v-2", &payload("B"), 100).await.unwrap();
        insert(&db, "v-3", &payload("C"), 200).await.unwrap();
        update_status(&db, "v-2", SyncStatus::Syncing, None).await.unwrap();

        let pending = list_by_status(&db, SyncStatus::Pending).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v-1", "v-3"]);

        let all = list_all(&db).await.unwrap();
        assert_eq!(all.len(), 3);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failing_increments_retry_and_stores_error() {
        let (db, _dir) = setup_db().await;
        insert(&db, "v-1", &payload("A"), 1).await.unwrap();

        update_status(&db, "v-1", SyncStatus::Syncing, None).await.unwrap();
        update_status(&db, "v-1", SyncStatus::Failed, Some("HTTP 503"))
            .await
            .unwrap();
        assert_eq!(
            status_and_retries(&db, "v-1").await,
            (SyncStatus::Failed, 1, Some("HTTP 503".to_string()))
        );

        update_status(&db, "v-1", SyncStatus::Syncing, None).await.unwrap();
        // Moving to syncing keeps the counter and the last error.
        assert_eq!(
            status_and_retries(&db, "v-1").await,
            (SyncStatus::Syncing, 1, Some("HTTP 503".to_string()))
        );
        update_status(&db, "v-1", SyncStatus::Failed, Some("timeout"))
            .await
            .unwrap();
        assert_eq!(
            status_and_retries(&db, "v-1").await,
            (SyncStatus::Failed, 2, Some("timeout".to_string()))
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected_and_leaves_row_untouched() {
        let (db, _dir) = setup_db().await;
        insert(&db, "v-1", &payload("A"), 1).await.unwrap();

        let err = update_status(&db, "v-1", SyncStatus::Synced, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FieldSyncError::InvalidTransition {
                from: SyncStatus::Pending,
                to: SyncStatus::Synced,
                ..
            }
        ));
        assert_eq!(
            status_and_retries(&db, "v-1").await,
            (SyncStatus::Pending, 0, None)
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_missing_id_is_silent_noop() {
        let (db, _dir) = setup_db().await;
        update_status(&db, "gone", SyncStatus::Failed, Some("x"))
            .await
            .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_and_count() {
        let (db, _dir) = setup_db().await;
        for i in 0..4 {
            insert(&db, &format!("v-{i}"), &payload("A"), i).await.unwrap();
        }
        assert_eq!(count_by_status(&db, SyncStatus::Pending).await.unwrap(), 4);

        delete(&db, "v-2").await.unwrap();
        delete(&db, "v-2").await.unwrap();
        assert_eq!(count_by_status(&db, SyncStatus::Pending).await.unwrap(), 3);
        assert!(get(&db, "v-2").await.unwrap().is_none());

        clear(&db).await.unwrap();
        assert!(list_all(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_inserts_no_sqlite_busy() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        let db = std::sync::Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                insert(&db, &format!("v-{i}"), &payload("A"), i).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(count_by_status(&db, SyncStatus::Pending).await.unwrap(), 10);
    }
}
