// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One remote write: resolve the actor, encode the attachment, submit.
//!
//! Shared by the orchestrator's per-record step and the capture path's
//! direct write, so both build the canonical payload identically.

use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::{
    BufferedVisit, CanonicalVisit, FieldSyncError, IdentityResolver, SubmissionAdapter,
};
use tracing::{debug, warn};

use crate::attachment::AttachmentEncoder;

/// Remote collaborators plus the tenant every visit is scoped to.
#[derive(Clone)]
pub struct Delivery {
    resolver: Arc<dyn IdentityResolver>,
    submitter: Arc<dyn SubmissionAdapter>,
    encoder: AttachmentEncoder,
    tenant: String,
    timeout: Option<Duration>,
}

impl Delivery {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        submitter: Arc<dyn SubmissionAdapter>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            submitter,
            encoder: AttachmentEncoder::default(),
            tenant: tenant.into(),
            timeout: None,
        }
    }

    pub fn with_encoder(mut self, encoder: AttachmentEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Bound resolution plus submission; `None` waits for the collaborators' own timeouts.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Deliver `record` and return the remote id.
    pub async fn deliver(&self, record: &BufferedVisit) -> Result<String, FieldSyncError> {
        match self.timeout {
            Some(duration) => tokio::time::timeout(duration, self.submit(record))
                .await
                .map_err(|_| FieldSyncError::Timeout { duration })?,
            None => self.submit(record).await,
        }
    }

    async fn submit(&self, record: &BufferedVisit) -> Result<String, FieldSyncError> {
        let phone = &record.payload.actor_phone;
        let user_id = self
            .resolver
            .resolve(phone, &self.tenant)
            .await?
            .ok_or_else(|| FieldSyncError::IdentityNotFound {
                phone: phone.clone(),
            })?;
        debug!(record_id = %record.id, "actor resolved");

        let image = record.payload.attachment.as_ref().and_then(|attachment| {
            self.encoder
                .encode(attachment)
                .inspect_err(|e| {
                    warn!(record_id = %record.id, error = %e, "submitting without attachment");
                })
                .ok()
        });

        let visit = CanonicalVisit::build(record, user_id, self.tenant.clone(), image);
        self.submitter.create(&self.tenant, &visit).await
    }
}
