// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the real stack: SQLite queue, HTTP collaborators
//! against a wiremock backend, and the sync orchestrator.
//!
//! Each test gets its own temp database and mock server.

use std::sync::{Arc, Mutex};

use fieldsync_config::model::{RemoteConfig, StorageConfig, SyncConfig};
use fieldsync_core::{Clock, Connectivity, PluginAdapter, SyncOutcome, SyncStatus, VisitQueue};
use fieldsync_remote::{ConnectivityProbe, HttpIdentityResolver, HttpSubmissionAdapter, RestClient};
use fieldsync_storage::{SqliteVisitQueue, StoreLock};
use fieldsync_sync::{CaptureService, Captured, Delivery, SyncOrchestrator};
use fieldsync_test_utils::{visit_payload, ScriptedResolver, ScriptedSubmitter};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "tenant-1";

struct Stack {
    _dir: TempDir,
    db_path: std::path::PathBuf,
    server: MockServer,
    client: RestClient,
}

impl Stack {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("queue.db");
        let server = MockServer::start().await;
        let client = RestClient::new(&RemoteConfig {
            base_url: Some(server.uri()),
            api_key: Some("anon-key".into()),
            tenant_id: Some(TENANT.into()),
            ..RemoteConfig::default()
        })
        .unwrap();
        Self {
            _dir: dir,
            db_path,
            server,
            client,
        }
    }

    async fn open_queue(&self) -> Arc<SqliteVisitQueue> {
        Arc::new(
            SqliteVisitQueue::open(StorageConfig {
                database_path: self.db_path.to_string_lossy().into_owned(),
                wal_mode: true,
            })
            .await
            .unwrap(),
        )
    }

    fn delivery(&self) -> Delivery {
        Delivery::new(
            Arc::new(HttpIdentityResolver::new(self.client.clone())),
            Arc::new(HttpSubmissionAdapter::new(self.client.clone())),
            TENANT,
        )
    }

    fn orchestrator(&self, queue: Arc<SqliteVisitQueue>, connectivity: Connectivity) -> SyncOrchestrator {
        SyncOrchestrator::new(
            queue,
            self.delivery(),
            connectivity,
            SyncConfig {
                record_delay_ms: 10,
                submit_timeout_secs: 5,
                ..SyncConfig::default()
            },
        )
    }

    async fn mount_backend(&self) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("company_id", "eq.tenant-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": "user-7"}])))
            .mount(&self.server)
            .await;
    }

    async fn mount_visit_success(&self) {
        Mock::given(method("POST"))
            .and(path("/rest/v1/visits"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!([{"id": "visit-1"}])),
            )
            .mount(&self.server)
            .await;
    }

    async fn visit_posts(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/visits")
            .count()
    }
}

#[tokio::test]
async fn offline_capture_then_partial_sync() {
    let stack = Stack::new().await;
    stack.mount_backend().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .and(body_partial_json(serde_json::json!({"customer_name": "B"})))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "message": "trigger rejected visit"
        })))
        .mount(&stack.server)
        .await;
    stack.mount_visit_success().await;

    let queue = stack.open_queue().await;
    let connectivity = Connectivity::new(false);
    for name in ["A", "B", "C"] {
        queue.insert(&visit_payload(name)).await.unwrap();
    }

    let orchestrator = stack.orchestrator(queue.clone(), connectivity.clone());
    let notifications = Arc::new(Mutex::new(Vec::new()));
    let sink = notifications.clone();
    let _sub = orchestrator.on_sync_complete(move |outcome| sink.lock().unwrap().push(outcome));

    let probe = ConnectivityProbe::new(stack.client.clone(), "/health", std::time::Duration::from_secs(10));
    assert!(probe.check(&connectivity).await);

    let outcome = orchestrator.force_sync_now().await.unwrap();
    assert_eq!(outcome, SyncOutcome { success: 2, failed: 1 });

    let remaining = queue.list_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.customer_name, "B");
    assert_eq!(remaining[0].sync_status, SyncStatus::Failed);
    assert_eq!(remaining[0].retry_count, 1);
    assert!(remaining[0].last_error.as_deref().unwrap().contains("trigger rejected visit"));

    assert_eq!(*notifications.lock().unwrap(), vec![SyncOutcome { success: 2, failed: 1 }]);
    assert_eq!(stack.visit_posts().await, 3);
}

#[tokio::test]
async fn buffered_visit_survives_restart_and_syncs() {
    let stack = Stack::new().await;
    stack.mount_backend().await;
    stack.mount_visit_success().await;

    {
        let queue = stack.open_queue().await;
        queue.insert(&visit_payload("Durable")).await.unwrap();
        queue.shutdown().await.unwrap();
    }

    let queue = stack.open_queue().await;
    let pending = queue.list_by_status(SyncStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 0);

    let orchestrator = stack.orchestrator(queue.clone(), Connectivity::new(true));
    assert_eq!(orchestrator.force_sync_now().await.unwrap().success, 1);
    assert!(queue.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn record_interrupted_mid_sync_is_retried_after_restart() {
    let stack = Stack::new().await;
    stack.mount_backend().await;
    stack.mount_visit_success().await;

    let id = {
        let queue = stack.open_queue().await;
        let id = queue.insert(&visit_payload("Crashed")).await.unwrap();
        queue.update_status(&id, SyncStatus::Syncing, None).await.unwrap();
        queue.shutdown().await.unwrap();
        id
    };

    let queue = stack.open_queue().await;
    let orchestrator = stack.orchestrator(queue.clone(), Connectivity::new(true));

    // Without recovery the record still looks in flight and is left alone.
    assert_eq!(orchestrator.force_sync_now().await.unwrap(), SyncOutcome::noop());

    let db_path = stack.db_path.to_string_lossy().into_owned();
    let _owner = StoreLock::try_acquire(&db_path).unwrap().expect("no other owner");
    let report = queue.recover().await.unwrap();
    assert_eq!(report.interrupted, 1);

    let outcome = orchestrator.force_sync_now().await.unwrap();
    assert_eq!(outcome, SyncOutcome { success: 1, failed: 0 });
    assert!(queue.get(&id).await.unwrap().is_none());
    assert_eq!(stack.visit_posts().await, 1);
}

#[tokio::test]
async fn unknown_actor_stays_failed() {
    let stack = Stack::new().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&stack.server)
        .await;

    let queue = stack.open_queue().await;
    let id = queue.insert(&visit_payload("Orphan")).await.unwrap();
    let orchestrator = stack.orchestrator(queue.clone(), Connectivity::new(true));

    assert_eq!(
        orchestrator.force_sync_now().await.unwrap(),
        SyncOutcome { success: 0, failed: 1 }
    );
    let record = queue.get(&id).await.unwrap().unwrap();
    assert_eq!(record.sync_status, SyncStatus::Failed);
    assert!(record.last_error.unwrap().contains("no remote actor"));
    assert_eq!(stack.visit_posts().await, 0);
}

#[tokio::test]
async fn capture_writes_through_when_online_and_buffers_when_down() {
    let stack = Stack::new().await;
    stack.mount_backend().await;
    stack.mount_visit_success().await;

    let queue = stack.open_queue().await;
    let connectivity = Connectivity::new(true);
    let capture = CaptureService::new(queue.clone(), stack.delivery(), connectivity.clone());

    let direct = capture.capture(visit_payload("Online")).await.unwrap();
    assert_eq!(direct, Captured::Submitted("visit-1".into()));
    assert!(queue.list_all().await.unwrap().is_empty());

    connectivity.set_online(false);
    let buffered = capture.capture(visit_payload("Offline")).await.unwrap();
    let Captured::Buffered(id) = buffered else {
        panic!("expected buffered capture");
    };
    assert_eq!(
        queue.get(&id).await.unwrap().unwrap().sync_status,
        SyncStatus::Pending
    );
}

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

#[tokio::test]
async fn same_millisecond_captures_sync_in_capture_order() {
    let dir = TempDir::new().unwrap();
    let queue = Arc::new(SqliteVisitQueue::with_clock(
        StorageConfig {
            database_path: dir.path().join("queue.db").to_string_lossy().into_owned(),
            wal_mode: true,
        },
        Arc::new(FixedClock(1_000)),
    ));
    queue.initialize().await.unwrap();

    let names = ["first", "second", "third", "fourth", "fifth", "sixth"];
    for name in names {
        queue.insert(&visit_payload(name)).await.unwrap();
    }

    let submitter = Arc::new(ScriptedSubmitter::new());
    let orchestrator = SyncOrchestrator::new(
        queue.clone(),
        Delivery::new(Arc::new(ScriptedResolver::new()), submitter.clone(), TENANT),
        Connectivity::new(true),
        SyncConfig {
            record_delay_ms: 0,
            fifo: true,
            ..SyncConfig::default()
        },
    );
    assert_eq!(orchestrator.force_sync_now().await.unwrap().success, names.len());
    assert_eq!(submitter.customers(), names.map(String::from).to_vec());
}
