// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the hosted REST backend.
//!
//! Provides [`RestClient`] which handles URL construction, authentication
//! headers, error-body decoding, and a single retry on transient failures for
//! idempotent reads.

use std::time::Duration;

use fieldsync_config::model::RemoteConfig;
use fieldsync_core::FieldSyncError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// HTTP client for backend communication.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl RestClient {
    /// Builds a client from the `[remote]` config section.
    ///
    /// Fails with [`FieldSyncError::Config`] when `base_url` is unset or the
    /// API key is not a valid header value.
    pub fn new(config: &RemoteConfig) -> Result<Self, FieldSyncError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| FieldSyncError::Config("remote.base_url is not set".into()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(
                "apikey",
                HeaderValue::from_str(key).map_err(|e| {
                    FieldSyncError::Config(format!("invalid API key header value: {e}"))
                })?,
            );
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    FieldSyncError::Config(format!("invalid authorization header value: {e}"))
                })?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FieldSyncError::Remote {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            max_retries: 1,
        })
    }

    /// The normalized base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Url, FieldSyncError> {
        let raw = format!("{}{}", self.base_url, path);
        reqwest::Url::parse_with_params(&raw, params)
            .map_err(|e| FieldSyncError::Config(format!("invalid backend URL {raw}: {e}")))
    }

    /// GETs `path` with query `params` and decodes the JSON body.
    ///
    /// On transient errors (429, 500, 502, 503, 504), retries once after a
    /// short delay.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FieldSyncError> {
        let url = self.url(path, params)?;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, path, "retrying read after transient error");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(request_failed)?;

            let status = response.status();
            debug!(status = %status, attempt, path, "read response received");

            if status.is_success() {
                return decode(response).await;
            }

            if is_transient_error(status) && attempt < self.max_retries {
                last_error = Some(error_from_response(response).await);
                continue;
            }

            return Err(error_from_response(response).await);
        }

        Err(last_error.unwrap_or_else(|| FieldSyncError::remote("read failed after retries")))
    }

    /// POSTs `body` as JSON to `path`, asking the backend to echo the created rows.
    ///
    /// Never retried: the caller owns the decision to resend a write.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FieldSyncError> {
        let url = self.url(path, &[])?;
        let response = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        debug!(status = %status, path, "write response received");

        if status.is_success() {
            decode(response).await
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Returns `true` when GET `path` answers with a 2xx status.
    pub async fn is_reachable(&self, path: &str) -> bool {
        let Ok(url) = self.url(path, &[]) else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "reachability probe failed");
                false
            }
        }
    }
}

fn request_failed(e: reqwest::Error) -> FieldSyncError {
    if e.is_timeout() {
        FieldSyncError::Remote {
            message: "request timed out".into(),
            source: Some(Box::new(e)),
        }
    } else {
        FieldSyncError::Remote {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FieldSyncError> {
    let body = response.text().await.map_err(|e| FieldSyncError::Remote {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| FieldSyncError::Remote {
        message: format!("failed to parse backend response: {e}"),
        source: Some(Box::new(e)),
    })
}

async fn error_from_response(response: reqwest::Response) -> FieldSyncError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) => {
            let mut msg = format!("backend returned {status}: {}", api_err.message);
            if let Some(code) = api_err.code {
                msg.push_str(&format!(" (code {code})"));
            }
            if let Some(hint) = api_err.hint {
                msg.push_str(&format!("; hint: {hint}"));
            }
            msg
        }
        Err(_) => format!("backend returned {status}: {body}"),
    };
    warn!(status = %status, "backend request rejected");
    FieldSyncError::remote(message)
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
