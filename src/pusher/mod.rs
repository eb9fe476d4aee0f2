//! Notification pusher.
//!
//! Drains the push tube with a bounded set of concurrent callback deliveries.
//! Deliveries report back over a completion channel; the main loop applies
//! the ack/bury actions against the tube between dispatch rounds.

mod delivery;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::queue::Tube;

// Re-export public API
pub use delivery::{callback_body, notification_worker, Completion};

/// Settings of the pusher loop taken from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct PusherSettings {
    /// Maximum number of deliveries in flight
    pub pool_size: usize,
    pub take_timeout: Duration,
    pub sleep: Duration,
    pub sleep_on_fail: Duration,
}

impl PusherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pool_size: config.worker_pool_size,
            take_timeout: config.queue_take_timeout(),
            sleep: config.sleep(),
            sleep_on_fail: config.sleep_on_fail(),
        }
    }
}

/// Applies every completion queued so far to `tube`. Returns how many were applied.
///
/// Does not wait for more. Failed acks and buries are logged and dropped; the
/// task comes back once its claim expires.
pub async fn done_with_processed_tasks(
    tube: &dyn Tube,
    completions: &mut UnboundedReceiver<Completion>,
) -> usize {
    let mut applied = 0;
    while let Ok((task, action)) = completions.try_recv() {
        let id = task.id().to_string();
        log::debug!("Task {} done: {}", id, action);
        if let Err(e) = action.apply(tube, task).await {
            log::error!("Failed to {} task {} on {}: {}", action, id, tube.name(), e);
        }
        applied += 1;
    }
    applied
}

/// In-flight deliveries and their completion channel.
struct DeliveryPool {
    client: Arc<reqwest::Client>,
    in_flight: JoinSet<()>,
    completion_tx: UnboundedSender<Completion>,
    completion_rx: UnboundedReceiver<Completion>,
}

impl DeliveryPool {
    fn new(client: Arc<reqwest::Client>) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            client,
            in_flight: JoinSet::new(),
            completion_tx,
            completion_rx,
        }
    }

    fn free_count(&mut self, pool_size: usize) -> usize {
        while let Some(joined) = self.in_flight.try_join_next() {
            if let Err(e) = joined {
                log::error!("Delivery task failed: {}", e);
            }
        }
        pool_size.saturating_sub(self.in_flight.len())
    }

    /// One dispatch round: fills free slots from `tube`, then drains completions.
    async fn main_loop(&mut self, tube: &dyn Tube, settings: &PusherSettings) -> Result<()> {
        let free = self.free_count(settings.pool_size);
        for _ in 0..free {
            let Some(task) = tube
                .take(settings.take_timeout)
                .await
                .context("Failed to take push task")?
            else {
                break;
            };
            log::debug!("Start delivery of task {}", task.id());
            let client = Arc::clone(&self.client);
            let completion_tx = self.completion_tx.clone();
            self.in_flight.spawn(async move {
                notification_worker(&client, task, &completion_tx).await;
            });
        }
        done_with_processed_tasks(tube, &mut self.completion_rx).await;
        Ok(())
    }

    /// Waits for every in-flight delivery and applies the remaining completions.
    async fn drain(&mut self, tube: &dyn Tube) {
        log::info!("Waiting for {} deliveries to finish", self.in_flight.len());
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                log::error!("Delivery task failed: {}", e);
            }
        }
        done_with_processed_tasks(tube, &mut self.completion_rx).await;
    }
}

/// Runs the pusher until `cancel` fires, then lets in-flight deliveries finish.
///
/// A failed round is logged and followed by `sleep_on_fail` before the next one.
pub async fn run_pusher(
    tube: &dyn Tube,
    client: Arc<reqwest::Client>,
    settings: PusherSettings,
    cancel: CancellationToken,
) {
    log::info!(
        "Run pusher on {}. Pool size={}. Sleep time is {}s.",
        tube.name(),
        settings.pool_size,
        settings.sleep.as_secs()
    );
    let mut pool = DeliveryPool::new(client);

    while !cancel.is_cancelled() {
        let pause = match pool.main_loop(tube, &settings).await {
            Ok(()) => settings.sleep,
            Err(e) => {
                log::error!("Pusher round failed: {:#}", e);
                settings.sleep_on_fail
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    pool.drain(tube).await;
    log::info!("Pusher stopped");
}
