// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capture path: write through when possible, buffer otherwise.

use std::sync::Arc;

use fieldsync_core::{
    BufferedVisit, Clock, Connectivity, FieldSyncError, SyncStatus, SystemClock, VisitPayload,
    VisitQueue,
};
use tracing::{info, warn};

use crate::delivery::Delivery;

/// Where a captured visit ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    /// Written remotely right away; carries the remote id.
    Submitted(String),
    /// Stored in the local queue; carries the local record id.
    Buffered(String),
}

/// Entry point for newly captured visits.
///
/// Tries a direct remote write while online. Offline, or when that write
/// fails for any reason, the visit is inserted into the local queue for the
/// orchestrator to deliver later. Only a failure to buffer is returned as an
/// error.
pub struct CaptureService {
    queue: Arc<dyn VisitQueue>,
    delivery: Delivery,
    connectivity: Connectivity,
    clock: Arc<dyn Clock>,
}

impl CaptureService {
    pub fn new(queue: Arc<dyn VisitQueue>, delivery: Delivery, connectivity: Connectivity) -> Self {
        Self {
            queue,
            delivery,
            connectivity,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Deliver or buffer `payload`.
    ///
    /// The record id and capture time are fixed once, before any remote
    /// call, so a buffered fallback later syncs with the same `client_ref`
    /// and `captured_at` the direct write already sent.
    pub async fn capture(&self, payload: VisitPayload) -> Result<Captured, FieldSyncError> {
        let visit = BufferedVisit {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            enqueued_at: self.clock.now_millis(),
            sync_status: SyncStatus::Pending,
            retry_count: 0,
            last_error: None,
        };

        if self.connectivity.is_online() {
            match self.delivery.deliver(&visit).await {
                Ok(remote_id) => {
                    info!(record_id = %visit.id, remote_id = %remote_id, "visit submitted directly");
                    return Ok(Captured::Submitted(remote_id));
                }
                Err(e) => warn!(record_id = %visit.id, error = %e, "direct submission failed, buffering visit"),
            }
        }

        self.queue
            .insert_with(&visit.id, visit.enqueued_at, &visit.payload)
            .await?;
        info!(record_id = %visit.id, "visit buffered for later sync");
        Ok(Captured::Buffered(visit.id))
    }
}
