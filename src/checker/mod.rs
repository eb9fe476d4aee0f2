//! Redirect checker service.
//!
//! This module provides:
//! - Task adapter (task -> redirect walk -> recheck or result record)
//! - Worker loop run by each worker process
//! - Process pool supervision gated by a network health probe

mod adapter;
mod health;
mod pool;
mod supervisor;
mod worker;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::initialization::init_probe_client;

// Re-export public API
pub use adapter::{get_redirect_history_from_task, CheckOutcome, HistoryChecker, TaskChecker};
pub use health::{HealthProbe, HttpHealthProbe};
pub use pool::{ProcessWorkerPool, WorkerPool};
pub use supervisor::{main_loop_function, run_checker};
pub use worker::{parent_alive, run_worker, worker, worker_loop_function, WorkerSettings};

/// Runs the supervisor with worker processes re-executing this binary.
///
/// # Errors
///
/// Returns an error if the probe client cannot be built or the own executable
/// cannot be located.
pub async fn run_supervisor(config: &Config, cancel: CancellationToken) -> Result<()> {
    let client = init_probe_client(config).context("Failed to initialize probe client")?;
    let probe = HttpHealthProbe::new(client, config.check_url.clone(), config.http_timeout());
    let mut pool = ProcessWorkerPool::current_exe(config)?;

    run_checker(
        &mut pool,
        &probe,
        config.worker_pool_size,
        config.sleep(),
        cancel,
    )
    .await;
    Ok(())
}
