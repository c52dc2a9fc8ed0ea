// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed durable queue for buffered field visits.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the status-indexed storage
//! primitives the sync orchestrator drives, plus an advisory lock that decides
//! which process may run crash recovery.

pub mod adapter;
pub mod database;
pub mod lock;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteVisitQueue;
pub use database::Database;
pub use lock::StoreLock;
