//! Worker process pool.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};

use crate::config::{Config, WORKER_CONFIG_ENV};

/// Handles on the worker processes owned by the supervisor.
pub trait WorkerPool: Send {
    /// Number of workers still running. Exited workers are reaped.
    fn alive(&mut self) -> usize;

    /// Starts `count` new workers and returns how many were started.
    fn spawn(&mut self, count: usize) -> Result<usize>;

    /// Kills every running worker.
    fn terminate_all(&mut self);
}

/// Pool of OS processes re-executing this binary with the `worker` subcommand.
///
/// The configuration is handed over as JSON in `WORKER_CONFIG_ENV`.
pub struct ProcessWorkerPool {
    program: PathBuf,
    config_json: String,
    parent_pid: u32,
    children: Vec<Child>,
}

impl ProcessWorkerPool {
    pub fn new(program: PathBuf, config: &Config) -> Result<Self> {
        let config_json =
            serde_json::to_string(config).context("Failed to serialize worker configuration")?;
        Ok(Self {
            program,
            config_json,
            parent_pid: std::process::id(),
            children: Vec::new(),
        })
    }

    /// Pool re-executing the running binary.
    pub fn current_exe(config: &Config) -> Result<Self> {
        let program = std::env::current_exe().context("Failed to locate own executable")?;
        Self::new(program, config)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("worker")
            .arg("--parent-pid")
            .arg(self.parent_pid.to_string())
            .env(WORKER_CONFIG_ENV, &self.config_json)
            .kill_on_drop(false);
        command
    }
}

impl WorkerPool for ProcessWorkerPool {
    fn alive(&mut self) -> usize {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                log::warn!("Worker {:?} exited with {}", child.id(), status);
                false
            }
            Err(e) => {
                log::error!("Failed to poll worker {:?}: {}", child.id(), e);
                false
            }
        });
        self.children.len()
    }

    fn spawn(&mut self, count: usize) -> Result<usize> {
        for started in 0..count {
            let child = self
                .command()
                .spawn()
                .with_context(|| format!("Failed to spawn worker {} of {}", started + 1, count))?;
            log::debug!("Spawned worker {:?}", child.id());
            self.children.push(child);
        }
        Ok(count)
    }

    fn terminate_all(&mut self) {
        for child in &mut self.children {
            if let Err(e) = child.start_kill() {
                log::warn!("Failed to kill worker {:?}: {}", child.id(), e);
            }
        }
        self.alive();
    }
}
