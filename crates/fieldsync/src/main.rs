// SPDX-FileCopyrightText: 2026 Fieldsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fieldsync - offline-first field visit capture and sync.
//!
//! This is the binary entry point: the `serve` daemon plus operator commands
//! over the local queue.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod ops;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldsync_config::FieldSyncConfig;

/// Fieldsync - offline-first field visit capture and sync.
#[derive(Parser, Debug)]
#[command(name = "fieldsync", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync daemon until interrupted.
    Serve,
    /// Show buffered visit counts by status.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List every buffered visit.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run one sync pass now.
    Sync,
    /// Capture a visit from a JSON file.
    Enqueue {
        /// Visit JSON file.
        #[arg(long)]
        file: PathBuf,
        /// Photo to attach.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Move an abandoned visit back to pending.
    Requeue {
        /// Local record id.
        id: String,
    },
    /// Delete every buffered visit.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    fn needs_remote(&self) -> bool {
        matches!(self, Commands::Serve | Commands::Sync)
    }
}

fn load_config(path: Option<&std::path::Path>) -> FieldSyncConfig {
    let loaded = match path {
        Some(path) => fieldsync_config::load_and_validate_path(path),
        None => fieldsync_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            fieldsync_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("fieldsync: use --help for available commands");
        return;
    };

    let config = load_config(cli.config.as_deref());
    if command.needs_remote() {
        if let Err(errors) = fieldsync_config::require_remote(&config) {
            fieldsync_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
    serve::init_tracing(&config.agent.log_level);

    let result = match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Status { json } => status::run_status(&config, json).await,
        Commands::List { json } => status::run_list(&config, json).await,
        Commands::Sync => ops::run_sync(&config).await.map(|_| ()),
        Commands::Enqueue { file, image } => ops::run_enqueue(&config, &file, image.as_deref())
            .await
            .map(|_| ()),
        Commands::Requeue { id } => ops::run_requeue(&config, &id).await,
        Commands::Clear { yes } => ops::run_clear(&config, yes).await.map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("fieldsync: {e}");
        std::process::exit(1);
    }
}
