// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record and payload types shared by the queue, the orchestrator and the
//! remote collaborators.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Queue,
    IdentityResolver,
    Submission,
    Connectivity,
}

/// Synchronization status of a buffered visit.
///
/// Stored as its snake_case name in the local queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Captured locally, never attempted.
    Pending,
    /// Claimed by the running pass.
    Syncing,
    /// Last attempt failed; eligible for a later pass.
    Failed,
    /// Confirmed remotely; deleted right after being marked.
    Synced,
    /// Retry ceiling reached; only an operator requeue brings it back.
    Abandoned,
}

impl SyncStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [SyncStatus; 5] = [
        SyncStatus::Pending,
        SyncStatus::Syncing,
        SyncStatus::Failed,
        SyncStatus::Synced,
        SyncStatus::Abandoned,
    ];

    /// Whether a record may move from `self` to `next`.
    pub fn can_transition_to(self, next: SyncStatus) -> bool {
        use SyncStatus::*;
        matches!(
            (self, next),
            (Pending, Syncing)
                | (Failed, Syncing)
                | (Syncing, Synced)
                | (Syncing, Failed)
                | (Failed, Abandoned)
                | (Abandoned, Pending)
        )
    }

    /// `synced` and `abandoned` are never picked up by a pass.
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Abandoned)
    }
}

/// GPS fix taken at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported horizontal accuracy in meters, when the device provides one.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

/// A photo attached to a visit, held as raw bytes until sync time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

/// A visit exactly as captured in the field.
///
/// Carries the actor's phone number rather than a resolved remote identity;
/// resolution happens at sync time. The attachment is persisted in its own
/// column and is not part of the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitPayload {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub meeting_types: Vec<String>,
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub location: GeoPoint,
    /// Phone attribute of the capturing field agent.
    pub actor_phone: String,
    #[serde(skip)]
    pub attachment: Option<Attachment>,
}

/// The unit of durability in the local queue.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedVisit {
    /// Locally generated UUID; never a remote identifier.
    pub id: String,
    pub payload: VisitPayload,
    /// Capture time in epoch milliseconds.
    pub enqueued_at: i64,
    pub sync_status: SyncStatus,
    /// Incremented on every failed attempt.
    pub retry_count: u32,
    pub last_error: Option<String>,
}

/// Result of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: usize,
    pub failed: usize,
}

impl SyncOutcome {
    /// The result of a pass that did nothing (gate held, offline, or empty queue).
    pub fn noop() -> Self {
        Self::default()
    }

    /// Total number of records attempted.
    pub fn attempted(&self) -> usize {
        self.success + self.failed
    }
}

/// Cheap status read for UI polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusSnapshot {
    pub pending_count: u64,
    pub in_progress: bool,
    pub is_online: bool,
}

/// Submission-ready form of a visit, built from a buffered record plus the
/// resolved actor identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalVisit {
    pub user_id: String,
    pub company_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_id: Option<String>,
    pub meeting_types: Vec<String>,
    pub product_ids: Vec<String>,
    pub notes: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub location_accuracy_m: Option<f64>,
    /// Data URL of the encoded attachment, if any survived encoding.
    pub image: Option<String>,
    /// RFC 3339 capture time.
    pub captured_at: String,
    /// Local record id, so the backend can drop duplicate deliveries.
    pub client_ref: String,
}

impl CanonicalVisit {
    /// Assemble the canonical payload for `record`.
    pub fn build(
        record: &BufferedVisit,
        user_id: String,
        company_id: String,
        image: Option<String>,
    ) -> Self {
        let p = &record.payload;
        let captured_at = chrono::DateTime::from_timestamp_millis(record.enqueued_at)
            .unwrap_or_default()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        Self {
            user_id,
            company_id,
            customer_name: p.customer_name.clone(),
            customer_phone: p.customer_phone.clone(),
            customer_id: p.customer_id.clone(),
            meeting_types: p.meeting_types.clone(),
            product_ids: p.product_ids.clone(),
            notes: p.notes.clone(),
            latitude: p.location.latitude,
            longitude: p.location.longitude,
            location_accuracy_m: p.location.accuracy_m,
            image,
            captured_at,
            client_ref: record.id.clone(),
        }
    }
}
