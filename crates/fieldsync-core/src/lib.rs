// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the fieldsync offline capture subsystem.
//!
//! This crate provides the record types, the error type, and the collaborator
//! traits (queue, identity resolver, submission adapter, clock) that the
//! storage, sync, and remote crates implement or consume.

pub mod connectivity;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use connectivity::Connectivity;
pub use error::FieldSyncError;
pub use types::{
    AdapterType, Attachment, BufferedVisit, CanonicalVisit, GeoPoint, HealthStatus, SyncOutcome,
    SyncStatus, SyncStatusSnapshot, VisitPayload,
};

pub use traits::{
    Clock, IdentityResolver, PluginAdapter, RecoveryReport, SubmissionAdapter, SystemClock,
    VisitQueue, INTERRUPTED_ERROR,
};
