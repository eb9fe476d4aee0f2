//! Signal-driven shutdown.

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::config::SIGNAL_EXIT_CODE_OFFSET;

/// Final status of a service run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self { exit_code: 0 }
    }

    /// Outcome of a run stopped by signal number `signum`.
    pub fn from_signal(signum: i32) -> Self {
        Self {
            exit_code: SIGNAL_EXIT_CODE_OFFSET + signum,
        }
    }
}

fn install(kind: SignalKind, name: &str) -> Result<Signal> {
    signal(kind).with_context(|| format!("Failed to install {} handler", name))
}

/// Installs handlers for SIGTERM, SIGINT, SIGHUP and SIGQUIT.
///
/// The returned future resolves with the number of the first signal received,
/// after cancelling `cancel`, or with `None` if `cancel` fires first.
///
/// # Errors
///
/// Returns an error if a handler cannot be installed.
pub fn watch_signals(
    cancel: CancellationToken,
) -> Result<impl std::future::Future<Output = Option<i32>> + Send + 'static> {
    let mut sigterm = install(SignalKind::terminate(), "SIGTERM")?;
    let mut sigint = install(SignalKind::interrupt(), "SIGINT")?;
    let mut sighup = install(SignalKind::hangup(), "SIGHUP")?;
    let mut sigquit = install(SignalKind::quit(), "SIGQUIT")?;

    Ok(async move {
        let (signum, name) = tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = sigterm.recv() => (15, "SIGTERM"),
            _ = sigint.recv() => (2, "SIGINT"),
            _ = sighup.recv() => (1, "SIGHUP"),
            _ = sigquit.recv() => (3, "SIGQUIT"),
        };
        log::info!("Received {}, shutting down", name);
        cancel.cancel();
        Some(signum)
    })
}
