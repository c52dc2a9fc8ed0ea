// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for fieldsync integration tests.
//!
//! Provides in-memory and scripted collaborators so orchestrator and capture
//! tests run fast and deterministically without SQLite or a backend.
//!
//! # Components
//!
//! - [`MemoryVisitQueue`] - In-memory queue with the same lifecycle rules as the SQLite queue
//! - [`ScriptedResolver`] - Identity resolver with configurable misses
//! - [`ScriptedSubmitter`] - Submission adapter with per-customer failures and a hold gate
//! - [`TestHarness`] - All of the above plus a manual connectivity signal

pub mod harness;
pub mod memory_queue;
pub mod scripted_resolver;
pub mod scripted_submitter;

pub use harness::{visit_payload, TestHarness};
pub use memory_queue::MemoryVisitQueue;
pub use scripted_resolver::ScriptedResolver;
pub use scripted_submitter::ScriptedSubmitter;
