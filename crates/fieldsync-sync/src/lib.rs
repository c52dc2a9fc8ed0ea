// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync orchestration for fieldsync.
//!
//! Provides the [`SyncOrchestrator`] that reconciles the durable local queue
//! with the remote backend, the [`CaptureService`] that feeds it, and the
//! attachment encoder both rely on.

pub mod attachment;
pub mod capture;
pub mod delivery;
pub mod orchestrator;

pub use attachment::AttachmentEncoder;
pub use capture::{CaptureService, Captured};
pub use delivery::Delivery;
pub use fieldsync_core::Connectivity;
pub use orchestrator::{Subscription, SyncOrchestrator};
