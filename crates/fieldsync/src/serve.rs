// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldsync serve` command implementation.
//!
//! Claims the queue, starts the connectivity probe and the sync orchestrator,
//! and runs until SIGINT/SIGTERM.

use fieldsync_config::FieldSyncConfig;
use fieldsync_core::{Connectivity, FieldSyncError, PluginAdapter};
use fieldsync_sync::SyncOrchestrator;
use tracing::{error, info};

use crate::app::{self, Remote};
use crate::shutdown;

/// Run the `fieldsync serve` command.
pub async fn run_serve(config: FieldSyncConfig) -> Result<(), FieldSyncError> {
    let _owner = app::claim_queue(&config)?;
    let queue = app::open_queue(&config).await?;
    let remote = Remote::from_config(&config)?;
    info!(
        database = %config.storage.database_path,
        backend = config.remote.base_url.as_deref().unwrap_or_default(),
        "fieldsync starting"
    );

    let cancel = shutdown::install_signal_handler();
    let connectivity = Connectivity::new(false);

    let probe_task = {
        let probe = remote.probe.clone();
        let connectivity = connectivity.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { probe.run(connectivity, cancel).await })
    };
    info!(
        interval_secs = config.remote.probe_interval_secs,
        path = %config.remote.health_path,
        "connectivity probe started"
    );

    let orchestrator = SyncOrchestrator::new(
        queue.clone(),
        remote.delivery(&config),
        connectivity,
        config.sync.clone(),
    );
    let _completion = orchestrator.on_sync_complete(|outcome| {
        info!(
            success = outcome.success,
            failed = outcome.failed,
            "buffered visits delivered"
        );
    });
    orchestrator.start().await?;

    cancel.cancelled().await;

    orchestrator.stop().await;
    if let Err(e) = probe_task.await {
        error!(error = %e, "connectivity probe task failed");
    }
    queue.shutdown().await?;
    info!("fieldsync stopped");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fieldsync={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
