//! Health-gated supervision of the worker pool.

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::health::HealthProbe;
use super::pool::WorkerPool;

/// One supervisor tick.
///
/// Network up: starts `pool_size - alive` workers. Network down: kills all
/// workers; their unacked tasks return to the queue when the claims expire.
pub async fn main_loop_function(
    pool: &mut dyn WorkerPool,
    probe: &dyn HealthProbe,
    pool_size: usize,
) -> Result<()> {
    if !probe.is_up().await {
        log::error!("Network is down, stopping workers");
        pool.terminate_all();
        return Ok(());
    }

    let required = pool_size.saturating_sub(pool.alive());
    if required > 0 {
        log::info!("Spawning {} workers", required);
        pool.spawn(required)?;
    }
    Ok(())
}

/// Runs supervisor ticks every `sleep` until `cancel` fires.
///
/// Running workers are left alone on exit; they stop once they notice their
/// parent is gone.
pub async fn run_checker(
    pool: &mut dyn WorkerPool,
    probe: &dyn HealthProbe,
    pool_size: usize,
    sleep: Duration,
    cancel: CancellationToken,
) {
    log::info!(
        "Run main loop. Worker pool size={}. Sleep time is {}s.",
        pool_size,
        sleep.as_secs()
    );
    while !cancel.is_cancelled() {
        if let Err(e) = main_loop_function(pool, probe, pool_size).await {
            log::error!("Supervisor tick failed: {:#}", e);
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(sleep) => {}
        }
    }
    log::info!("Supervisor stopped with {} workers running", pool.alive());
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakePool {
        alive: usize,
        spawned: Vec<usize>,
        terminated: usize,
    }

    impl WorkerPool for FakePool {
        fn alive(&mut self) -> usize {
            self.alive
        }

        fn spawn(&mut self, count: usize) -> Result<usize> {
            self.spawned.push(count);
            self.alive += count;
            Ok(count)
        }

        fn terminate_all(&mut self) {
            self.terminated += 1;
            self.alive = 0;
        }
    }

    struct FakeProbe {
        up: AtomicBool,
        probes: AtomicUsize,
    }

    impl FakeProbe {
        fn new(up: bool) -> Self {
            Self {
                up: AtomicBool::new(up),
                probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HealthProbe for FakeProbe {
        async fn is_up(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.up.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_network_up_tops_up_pool() {
        let mut pool = FakePool {
            alive: 3,
            ..FakePool::default()
        };
        main_loop_function(&mut pool, &FakeProbe::new(true), 10)
            .await
            .unwrap();
        assert_eq!(pool.spawned, vec![7]);
        assert_eq!(pool.terminated, 0);
    }

    #[tokio::test]
    async fn test_full_pool_spawns_nothing() {
        let mut pool = FakePool {
            alive: 10,
            ..FakePool::default()
        };
        main_loop_function(&mut pool, &FakeProbe::new(true), 10)
            .await
            .unwrap();
        assert!(pool.spawned.is_empty());
    }

    #[tokio::test]
    async fn test_network_down_terminates_workers() {
        let mut pool = FakePool {
            alive: 4,
            ..FakePool::default()
        };
        main_loop_function(&mut pool, &FakeProbe::new(false), 10)
            .await
            .unwrap();
        assert_eq!(pool.terminated, 1);
        assert!(pool.spawned.is_empty());
        assert_eq!(pool.alive, 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        struct BrokenPool;

        impl WorkerPool for BrokenPool {
            fn alive(&mut self) -> usize {
                0
            }
            fn spawn(&mut self, _count: usize) -> Result<usize> {
                anyhow::bail!("no such file")
            }
            fn terminate_all(&mut self) {}
        }

        let result = main_loop_function(&mut BrokenPool, &FakeProbe::new(true), 2).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_checker_ticks_until_cancelled() {
        let mut pool = FakePool::default();
        let probe = Arc::new(FakeProbe::new(true));
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                cancel.cancel();
            })
        };
        run_checker(&mut pool, probe.as_ref(), 2, Duration::from_millis(10), cancel).await;
        stopper.await.unwrap();

        assert!(probe.probes.load(Ordering::SeqCst) >= 2);
        // Pool was filled on the first tick only
        assert_eq!(pool.spawned, vec![2]);
    }

    #[tokio::test]
    async fn test_run_checker_returns_immediately_when_cancelled() {
        let mut pool = FakePool::default();
        let probe = FakeProbe::new(true);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_checker(&mut pool, &probe, 2, Duration::from_secs(10), cancel).await;
        assert_eq!(probe.probes.load(Ordering::SeqCst), 0);
    }
}
