//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `redirect_checker` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Signal handling and the process exit status
//!
//! Options go before the subcommand: `redirect_checker --sleep 5 checker`.

use std::future::Future;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use tokio_util::sync::CancellationToken;

use redirect_checker::app::{create_pidfile, remove_pidfile, watch_signals};
use redirect_checker::checker::{run_supervisor, run_worker};
use redirect_checker::config::WORKER_CONFIG_ENV;
use redirect_checker::error_handling::InitializationError;
use redirect_checker::initialization::{init_logger_with, init_push_client};
use redirect_checker::pusher::{run_pusher, PusherSettings};
use redirect_checker::{Config, RedisTube, RunOutcome};

#[derive(Parser)]
#[command(name = "redirect_checker", version, about)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Supervise checker worker processes
    Checker,
    /// Run one checker worker (started by `checker`)
    #[command(hide = true)]
    Worker {
        /// Supervisor process id; the worker exits once it is gone
        #[arg(long)]
        parent_pid: u32,
    },
    /// Deliver queued notifications to their callbacks
    Pusher,
}

/// Configuration handed over by the supervisor.
fn worker_config() -> Result<Config, InitializationError> {
    let raw = std::env::var(WORKER_CONFIG_ENV).map_err(|e| {
        InitializationError::WorkerConfigError(format!("{}: {}", WORKER_CONFIG_ENV, e))
    })?;
    serde_json::from_str(&raw).map_err(|e| InitializationError::WorkerConfigError(e.to_string()))
}

/// Runs `service` with the pidfile in place, if one is configured.
async fn with_pidfile(config: &Config, service: impl Future<Output = Result<()>>) -> Result<()> {
    let Some(pidfile) = &config.pidfile else {
        return service.await;
    };
    create_pidfile(pidfile)
        .map_err(InitializationError::from)
        .with_context(|| format!("Failed to create pidfile {}", pidfile.display()))?;
    let result = service.await;
    remove_pidfile(pidfile);
    result
}

async fn run_push_service(config: &Config, cancel: CancellationToken) -> Result<()> {
    let client = init_push_client(config).context("Failed to initialize HTTP client")?;
    let tube = RedisTube::connect(config, &config.push_tube)
        .await
        .context("Failed to connect push tube")?;
    run_pusher(&tube, client, PusherSettings::from_config(config), cancel).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();
    let config = match cli.command {
        Command::Worker { .. } => worker_config()?,
        _ => cli.config,
    };

    init_logger_with(config.log_level.into(), config.log_format)
        .context("Failed to initialize logger")?;

    if let Err(e) = config.validate() {
        eprintln!("redirect_checker: invalid configuration: {}", e);
        process::exit(2);
    }

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(watch_signals(cancel.clone())?);

    let result = match cli.command {
        Command::Checker => with_pidfile(&config, run_supervisor(&config, cancel.clone())).await,
        Command::Worker { parent_pid } => run_worker(config, parent_pid, cancel.clone()).await,
        Command::Pusher => with_pidfile(&config, run_push_service(&config, cancel.clone())).await,
    };

    // Stops the signal watcher unless a signal already ended the run
    cancel.cancel();
    let outcome = match signals.await.ok().flatten() {
        Some(signum) => RunOutcome::from_signal(signum),
        None => RunOutcome::success(),
    };

    if let Err(e) = result {
        log::error!("redirect_checker error: {:#}", e);
        eprintln!("redirect_checker error: {:#}", e);
        process::exit(1);
    }
    process::exit(outcome.exit_code);
}
