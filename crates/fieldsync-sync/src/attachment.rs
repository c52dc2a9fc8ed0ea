// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of captured photos into the transferable data-URL form.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use fieldsync_config::model::AttachmentConfig;
use fieldsync_core::{Attachment, FieldSyncError};

/// Encodes attachments as `data:<mime>;base64,<payload>` URLs.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentEncoder {
    max_bytes: usize,
}

impl AttachmentEncoder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn from_config(config: &AttachmentConfig) -> Self {
        Self::new(config.max_bytes)
    }

    /// Encode `attachment`, rejecting empty, non-image and oversized payloads.
    pub fn encode(&self, attachment: &Attachment) -> Result<String, FieldSyncError> {
        if attachment.bytes.is_empty() {
            return Err(FieldSyncError::Attachment("attachment is empty".into()));
        }

        let mime = attachment.mime_type.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(FieldSyncError::Attachment(format!(
                "unsupported attachment type {:?}",
                attachment.mime_type
            )));
        }

        if attachment.bytes.len() > self.max_bytes {
            return Err(FieldSyncError::Attachment(format!(
                "attachment is {} bytes, limit is {}",
                attachment.bytes.len(),
                self.max_bytes
            )));
        }

        Ok(format!("data:{mime};base64,{}", STANDARD.encode(&attachment.bytes)))
    }
}

impl Default for AttachmentEncoder {
    fn default() -> Self {
        Self::from_config(&AttachmentConfig::default())
    }
}
