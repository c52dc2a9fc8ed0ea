// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Submission adapter with scripted failures and a hold gate.
//!
//! `ScriptedSubmitter` records every canonical visit it receives. Visits for
//! customers registered with [`fail_for`](ScriptedSubmitter::fail_for) are
//! rejected. [`hold`](ScriptedSubmitter::hold) parks every call until
//! [`release`](ScriptedSubmitter::release), which lets tests observe a pass
//! mid-flight.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use fieldsync_core::{
    AdapterType, CanonicalVisit, FieldSyncError, HealthStatus, PluginAdapter, SubmissionAdapter,
};

pub struct ScriptedSubmitter {
    failing: Mutex<HashSet<String>>,
    submitted: Mutex<Vec<CanonicalVisit>>,
    held: AtomicBool,
    gate: Semaphore,
    entered: Notify,
    next_id: AtomicU64,
}

impl ScriptedSubmitter {
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
            submitted: Mutex::new(Vec::new()),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
            entered: Notify::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reject every visit for `customer_name`.
    pub fn fail_for(&self, customer_name: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(customer_name.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Park calls until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let parked and future calls through.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(1024);
    }

    /// Wait until some call has entered `create`.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Every visit received, in call order.
    pub fn submitted(&self) -> Vec<CanonicalVisit> {
        self.submitted.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Customer names received, in call order.
    pub fn customers(&self) -> Vec<String> {
        self.submitted()
            .into_iter()
            .map(|v| v.customer_name)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.submitted.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Default for ScriptedSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedSubmitter {
    fn name(&self) -> &str {
        "scripted-submitter"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Submission
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldSyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldSyncError> {
        Ok(())
    }
}

#[async_trait]
impl SubmissionAdapter for ScriptedSubmitter {
    async fn create(&self, _tenant: &str, visit: &CanonicalVisit) -> Result<String, FieldSyncError> {
        self.submitted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(visit.clone());
        self.entered.notify_one();

        if self.held.load(Ordering::SeqCst) {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| FieldSyncError::Internal(e.to_string()))?;
            permit.forget();
        }

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&visit.customer_name);
        if failing {
            return Err(FieldSyncError::remote(format!(
                "scripted rejection for {}",
                visit.customer_name
            )));
        }

        Ok(format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn visit(customer: &str) -> CanonicalVisit {
        CanonicalVisit {
            user_id: "user-1".into(),
            company_id: "tenant-1".into(),
            customer_name: customer.into(),
            customer_phone: "+1".into(),
            customer_id: None,
            meeting_types: vec![],
            product_ids: vec![],
            notes: None,
            latitude: 0.0,
            longitude: 0.0,
            location_accuracy_m: None,
            image: None,
            captured_at: "2026-01-01T00:00:00.000Z".into(),
            client_ref: "visit-1".into(),
        }
    }

    #[tokio::test]
    async fn scripted_failures_and_ids() {
        let submitter = ScriptedSubmitter::new();
        submitter.fail_for("B");
        assert_eq!(submitter.create("t", &visit("A")).await.unwrap(), "remote-1");
        assert!(submitter.create("t", &visit("B")).await.is_err());
        assert_eq!(submitter.customers(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn hold_parks_until_release() {
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.hold();
        let task = {
            let submitter = submitter.clone();
            tokio::spawn(async move { submitter.create("t", &visit("A")).await })
        };
        submitter.wait_entered().await;
        assert!(!task.is_finished());
        submitter.release();
        assert!(task.await.unwrap().is_ok());
    }
}
