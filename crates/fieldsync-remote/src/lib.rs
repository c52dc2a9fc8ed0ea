// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST backend adapters for fieldsync.
//!
//! Talks to a PostgREST-style API: actor lookup by phone, visit creation, and
//! a reachability probe that drives the shared [`Connectivity`](fieldsync_core::Connectivity)
//! signal.

pub mod client;
pub mod identity;
pub mod probe;
pub mod submission;

pub use client::RestClient;
pub use identity::HttpIdentityResolver;
pub use probe::ConnectivityProbe;
pub use submission::HttpSubmissionAdapter;
