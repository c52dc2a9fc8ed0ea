// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Async collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod clock;
pub mod identity;
pub mod queue;
pub mod submission;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use identity::IdentityResolver;
pub use queue::{RecoveryReport, VisitQueue, INTERRUPTED_ERROR};
pub use submission::SubmissionAdapter;
