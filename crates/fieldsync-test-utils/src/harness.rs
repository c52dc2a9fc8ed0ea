// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for orchestrator and capture tests.
//!
//! `TestHarness` bundles an in-memory queue, scripted remote collaborators,
//! and a manually driven connectivity signal. Tests wire these into the
//! component under test and script behaviour through the public fields.

use std::sync::Arc;

use fieldsync_core::{Connectivity, GeoPoint, VisitPayload};

use crate::memory_queue::MemoryVisitQueue;
use crate::scripted_resolver::ScriptedResolver;
use crate::scripted_submitter::ScriptedSubmitter;

/// Phone attribute stamped on every [`visit_payload`].
pub const ACTOR_PHONE: &str = "+15550999";

/// A representative captured visit for `customer_name`.
pub fn visit_payload(customer_name: &str) -> VisitPayload {
    VisitPayload {
        customer_name: customer_name.to_string(),
        customer_phone: "+15550100".to_string(),
        customer_id: None,
        meeting_types: vec!["follow_up".to_string()],
        product_ids: vec!["sku-1".to_string()],
        notes: Some(format!("visited {customer_name}")),
        location: GeoPoint {
            latitude: 19.07,
            longitude: 72.87,
            accuracy_m: Some(8.5),
        },
        actor_phone: ACTOR_PHONE.to_string(),
        attachment: None,
    }
}

/// Fakes for every orchestrator collaborator.
pub struct TestHarness {
    pub queue: Arc<MemoryVisitQueue>,
    pub resolver: Arc<ScriptedResolver>,
    pub submitter: Arc<ScriptedSubmitter>,
    pub connectivity: Connectivity,
}

impl TestHarness {
    fn with_connectivity(online: bool) -> Self {
        Self {
            queue: Arc::new(MemoryVisitQueue::new()),
            resolver: Arc::new(ScriptedResolver::new()),
            submitter: Arc::new(ScriptedSubmitter::new()),
            connectivity: Connectivity::new(online),
        }
    }

    /// A harness whose backend starts reachable.
    pub fn online() -> Self {
        Self::with_connectivity(true)
    }

    /// A harness whose backend starts unreachable.
    pub fn offline() -> Self {
        Self::with_connectivity(false)
    }
}
