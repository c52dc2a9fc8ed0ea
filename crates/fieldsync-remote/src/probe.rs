// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic backend reachability probe.
//!
//! Publishes into a shared [`Connectivity`] handle; the sync orchestrator
//! reacts to the offline-to-online edges it produces.

use std::time::Duration;

use fieldsync_core::Connectivity;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::RestClient;

/// Polls the backend health endpoint and records the result.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    client: RestClient,
    health_path: String,
    interval: Duration,
}

impl ConnectivityProbe {
    pub fn new(client: RestClient, health_path: impl Into<String>, interval: Duration) -> Self {
        Self {
            client,
            health_path: health_path.into(),
            interval,
        }
    }

    /// Probe once and publish the result.
    pub async fn check(&self, connectivity: &Connectivity) -> bool {
        let online = self.client.is_reachable(&self.health_path).await;
        if connectivity.set_online(online) {
            info!(online, "connectivity changed");
        } else {
            debug!(online, "connectivity unchanged");
        }
        online
    }

    /// Probe immediately, then every `interval` until `cancel` fires.
    pub async fn run(self, connectivity: Connectivity, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.check(&connectivity).await;
                }
                _ = cancel.cancelled() => {
                    info!("connectivity probe shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_config::model::RemoteConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe(base_url: &str) -> ConnectivityProbe {
        let config = RemoteConfig {
            base_url: Some(base_url.to_string()),
            ..RemoteConfig::default()
        };
        ConnectivityProbe::new(
            RestClient::new(&config).unwrap(),
            "/health",
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn check_publishes_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let connectivity = Connectivity::new(false);
        assert!(probe(&server.uri()).check(&connectivity).await);
        assert!(connectivity.is_online());
    }

    #[tokio::test]
    async fn failing_health_goes_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let connectivity = Connectivity::new(true);
        assert!(!probe(&server.uri()).check(&connectivity).await);
        assert!(!connectivity.is_online());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(probe(&server.uri()).run(connectivity.clone(), cancel.clone()));

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(connectivity.is_online());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
