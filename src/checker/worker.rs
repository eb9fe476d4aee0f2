//! Checker worker: one process consuming the input tube.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use super::adapter::{HistoryChecker, TaskChecker};
use crate::config::Config;
use crate::history::WalkOptions;
use crate::initialization::init_redirect_client;
use crate::queue::{PutOptions, RedisTube, Task, Tube};
use crate::resolve::HttpResolver;

/// Settings of the worker loop taken from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub take_timeout: Duration,
    pub recheck_delay: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            take_timeout: config.queue_take_timeout(),
            recheck_delay: config.recheck_delay(),
        }
    }
}

/// Runs one iteration of the worker loop.
///
/// Takes one task from `input_tube` and dispatches the check outcome:
/// - no task: returns
/// - no outcome: acks
/// - recheck: puts the payload back on `input_tube` after the recheck delay with
///   the task's priority, then acks
/// - finished: puts the record on `output_tube`, then acks
///
/// Ack failures are logged and swallowed. Queue failures of take or put are
/// returned.
pub async fn worker_loop_function(
    settings: &WorkerSettings,
    checker: &dyn TaskChecker,
    input_tube: &dyn Tube,
    output_tube: &dyn Tube,
) -> Result<()> {
    let Some(task) = input_tube
        .take(settings.take_timeout)
        .await
        .context("Failed to take task")?
    else {
        return Ok(());
    };
    log::debug!("Took task {} from {}", task.id(), input_tube.name());

    match checker.check(&task).await {
        None => {}
        Some((true, data)) => {
            log::info!(
                "Requeueing task {} on {} with delay {}s",
                task.id(),
                input_tube.name(),
                settings.recheck_delay.as_secs()
            );
            let options = PutOptions::delayed(settings.recheck_delay, task.meta().priority);
            input_tube
                .put(data, options)
                .await
                .context("Failed to requeue task")?;
        }
        Some((false, data)) => {
            output_tube
                .put(data, PutOptions::default())
                .await
                .context("Failed to put result")?;
        }
    }

    ack_task(input_tube, task).await;
    Ok(())
}

async fn ack_task(tube: &dyn Tube, task: Task) {
    let id = task.id().to_string();
    if let Err(e) = tube.ack(task).await {
        log::error!("Failed to ack task {} on {}: {}", id, tube.name(), e);
    }
}

/// True while the process with `pid` exists.
pub fn parent_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Worker loop until `cancel` fires or `alive` reports the parent gone.
pub async fn worker(
    settings: WorkerSettings,
    checker: &dyn TaskChecker,
    input_tube: &dyn Tube,
    output_tube: &dyn Tube,
    alive: impl Fn() -> bool,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        if !alive() {
            log::info!("Parent is gone, worker exiting");
            break;
        }
        if let Err(e) = worker_loop_function(&settings, checker, input_tube, output_tube).await {
            log::error!("Worker iteration failed: {:#}", e);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(settings.take_timeout) => {}
            }
        }
    }
}

/// Entry point of a worker process spawned by the supervisor.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or a tube cannot be
/// reached.
pub async fn run_worker(config: Config, parent_pid: u32, cancel: CancellationToken) -> Result<()> {
    let client = init_redirect_client(&config).context("Failed to initialize HTTP client")?;
    let checker = HistoryChecker::new(
        HttpResolver::from_config(Arc::clone(&client), &config),
        WalkOptions::from_config(&config),
    );
    let input_tube = RedisTube::connect(&config, &config.input_tube)
        .await
        .context("Failed to connect input tube")?;
    let output_tube = RedisTube::connect(&config, &config.output_tube)
        .await
        .context("Failed to connect output tube")?;

    log::info!("Worker {} started (parent {})", std::process::id(), parent_pid);
    worker(
        WorkerSettings::from_config(&config),
        &checker,
        &input_tube,
        &output_tube,
        || parent_alive(parent_pid),
        cancel,
    )
    .await;
    log::info!("Worker {} stopped", std::process::id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::adapter::CheckOutcome;
    use crate::models::Payload;
    use crate::queue::{MemoryTube, TubeStats};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedChecker {
        outcome: Option<CheckOutcome>,
        calls: AtomicUsize,
    }

    impl FixedChecker {
        fn new(outcome: Option<CheckOutcome>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskChecker for FixedChecker {
        async fn check(&self, _task: &Task) -> Option<CheckOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().expect("object payload")
    }

    fn settings() -> WorkerSettings {
        WorkerSettings {
            take_timeout: Duration::from_millis(10),
            recheck_delay: Duration::from_secs(300),
        }
    }

    fn tubes() -> (MemoryTube, MemoryTube) {
        (
            MemoryTube::new("check", Duration::from_secs(60)),
            MemoryTube::new("checked", Duration::from_secs(60)),
        )
    }

    #[tokio::test]
    async fn test_empty_input_does_nothing() {
        let (input, output) = tubes();
        let checker = FixedChecker::new(None);
        worker_loop_function(&settings(), &checker, &input, &output)
            .await
            .unwrap();
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(output.stats(), TubeStats::default());
    }

    #[tokio::test]
    async fn test_no_outcome_acks_task() {
        let (input, output) = tubes();
        input
            .put(payload(json!({"url": "x"})), PutOptions::default())
            .await
            .unwrap();
        let checker = FixedChecker::new(None);
        worker_loop_function(&settings(), &checker, &input, &output)
            .await
            .unwrap();
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(input.stats(), TubeStats::default());
        assert_eq!(output.stats(), TubeStats::default());
    }

    #[tokio::test]
    async fn test_recheck_requeues_with_delay_and_priority() {
        let (input, output) = tubes();
        let data = payload(json!({"url": "http://a.example/", "url_id": 3}));
        input
            .put(data.clone(), PutOptions::delayed(Duration::ZERO, 42))
            .await
            .unwrap();
        let checker = FixedChecker::new(Some((true, data)));
        worker_loop_function(&settings(), &checker, &input, &output)
            .await
            .unwrap();

        let stats = input.stats();
        assert_eq!(stats.delayed, 1);
        assert_eq!(stats.taken, 0);
        assert_eq!(stats.ready, 0);
        assert_eq!(output.stats(), TubeStats::default());
    }

    #[tokio::test]
    async fn test_recheck_keeps_task_priority() {
        let (input, output) = tubes();
        let data = payload(json!({"url": "http://a.example/"}));
        input
            .put(data.clone(), PutOptions::delayed(Duration::ZERO, 42))
            .await
            .unwrap();
        let checker = FixedChecker::new(Some((true, data)));
        let settings = WorkerSettings {
            take_timeout: Duration::from_millis(10),
            recheck_delay: Duration::from_millis(20),
        };
        worker_loop_function(&settings, &checker, &input, &output)
            .await
            .unwrap();

        let requeued = input
            .take(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("requeued task");
        assert_eq!(requeued.meta().priority, 42);
    }

    #[tokio::test]
    async fn test_finished_goes_to_output_and_acks() {
        let (input, output) = tubes();
        input
            .put(payload(json!({"url": "x"})), PutOptions::default())
            .await
            .unwrap();
        let record = payload(json!({"url": "x", "types": []}));
        let checker = FixedChecker::new(Some((false, record.clone())));
        worker_loop_function(&settings(), &checker, &input, &output)
            .await
            .unwrap();

        assert_eq!(input.stats(), TubeStats::default());
        assert_eq!(output.ready_payloads(), vec![record]);
    }

    /// Tube whose ack always fails.
    struct BrokenAckTube {
        inner: MemoryTube,
        acks: AtomicUsize,
    }

    #[async_trait]
    impl Tube for BrokenAckTube {
        fn name(&self) -> &str {
            self.inner.name()
        }
        async fn take(&self, timeout: Duration) -> Result<Option<Task>, crate::error_handling::QueueError> {
            self.inner.take(timeout).await
        }
        async fn put(&self, data: Payload, options: PutOptions) -> Result<(), crate::error_handling::QueueError> {
            self.inner.put(data, options).await
        }
        async fn ack(&self, _task: Task) -> Result<(), crate::error_handling::QueueError> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Err(crate::error_handling::QueueError::Durability(
                "connection reset".to_string(),
            ))
        }
        async fn bury(&self, task: Task) -> Result<(), crate::error_handling::QueueError> {
            self.inner.bury(task).await
        }
    }

    #[tokio::test]
    async fn test_ack_failure_is_not_fatal() {
        let input = BrokenAckTube {
            inner: MemoryTube::new("check", Duration::from_secs(60)),
            acks: AtomicUsize::new(0),
        };
        let output = MemoryTube::new("checked", Duration::from_secs(60));
        input
            .put(payload(json!({"url": "x"})), PutOptions::default())
            .await
            .unwrap();
        let checker = FixedChecker::new(None);
        let result = worker_loop_function(&settings(), &checker, &input, &output).await;
        assert!(result.is_ok());
        assert_eq!(input.acks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_worker_stops_when_parent_is_gone() {
        let (input, output) = tubes();
        input
            .put(payload(json!({"url": "x"})), PutOptions::default())
            .await
            .unwrap();
        let checker = FixedChecker::new(None);
        let polls = AtomicUsize::new(0);
        // Parent alive for the first iteration only
        let alive = || polls.fetch_add(1, Ordering::SeqCst) == 0;

        worker(settings(), &checker, &input, &output, alive, CancellationToken::new()).await;
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_worker_not_started_without_parent() {
        let (input, output) = tubes();
        let checker = FixedChecker::new(None);
        worker(settings(), &checker, &input, &output, || false, CancellationToken::new()).await;
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancel() {
        let (input, output) = tubes();
        let checker = FixedChecker::new(None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        worker(settings(), &checker, &input, &output, || true, cancel).await;
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parent_alive_for_own_process() {
        assert!(parent_alive(std::process::id()));
        assert!(!parent_alive(u32::MAX));
    }
}
