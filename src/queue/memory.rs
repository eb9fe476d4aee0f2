//! In-process tube.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::task::{PutOptions, Task, TaskMeta};
use super::Tube;
use crate::error_handling::QueueError;
use crate::models::Payload;

/// Counts of tasks per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TubeStats {
    pub ready: usize,
    pub delayed: usize,
    pub taken: usize,
    pub buried: usize,
}

struct Entry {
    data: Payload,
    priority: u32,
    seq: u64,
}

#[derive(Default)]
struct State {
    seq: u64,
    claims: u64,
    entries: HashMap<String, Entry>,
    // (priority, seq) keeps FIFO order within a priority
    ready: BTreeMap<(u32, u64), String>,
    delayed: Vec<(Instant, String)>,
    // id -> (claim deadline, claim token)
    taken: HashMap<String, (Instant, u64)>,
    buried: HashSet<String>,
}

impl State {
    fn make_ready(&mut self, id: String) {
        if let Some(entry) = self.entries.get(&id) {
            self.ready.insert((entry.priority, entry.seq), id);
        }
    }

    /// Moves due delayed tasks and expired claims back to ready.
    fn promote(&mut self, now: Instant) {
        let (due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.delayed)
                .into_iter()
                .partition(|(at, _)| *at <= now);
        self.delayed = pending;
        for (_, id) in due {
            self.make_ready(id);
        }

        let expired: Vec<String> = self
            .taken
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            log::warn!("Claim on task {} expired, returning it to ready", id);
            self.taken.remove(&id);
            self.make_ready(id);
        }
    }

    fn next_event(&self) -> Option<Instant> {
        self.delayed
            .iter()
            .map(|(at, _)| *at)
            .chain(self.taken.values().map(|(deadline, _)| *deadline))
            .min()
    }
}

/// Tube held in process memory.
///
/// Honors delay, priority (lower first, FIFO within a priority), claim
/// exclusivity with claim expiry, and bury. Contents are lost with the process.
pub struct MemoryTube {
    name: String,
    claim_timeout: Duration,
    state: Mutex<State>,
    notify: Notify,
}

impl MemoryTube {
    pub fn new(name: impl Into<String>, claim_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            claim_timeout,
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::Durability(format!("tube {} state poisoned", self.name)))
    }

    /// Current task counts per state.
    pub fn stats(&self) -> TubeStats {
        match self.lock() {
            Ok(mut state) => {
                state.promote(Instant::now());
                TubeStats {
                    ready: state.ready.len(),
                    delayed: state.delayed.len(),
                    taken: state.taken.len(),
                    buried: state.buried.len(),
                }
            }
            Err(_) => TubeStats::default(),
        }
    }

    /// Payloads of ready tasks in serving order.
    pub fn ready_payloads(&self) -> Vec<Payload> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        state
            .ready
            .values()
            .filter_map(|id| state.entries.get(id).map(|e| e.data.clone()))
            .collect()
    }

    /// Payloads of buried tasks, unordered.
    pub fn buried_payloads(&self) -> Vec<Payload> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        state
            .buried
            .iter()
            .filter_map(|id| state.entries.get(id).map(|e| e.data.clone()))
            .collect()
    }

    fn try_take(&self) -> Result<Result<Task, Option<Instant>>, QueueError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        state.promote(now);

        let Some((_, id)) = state.ready.pop_first() else {
            return Ok(Err(state.next_event()));
        };
        state.claims += 1;
        let claim = state.claims;
        state.taken.insert(id.clone(), (now + self.claim_timeout, claim));
        let entry = state
            .entries
            .get(&id)
            .ok_or_else(|| QueueError::UnknownTask(id.clone()))?;
        Ok(Ok(Task::new(
            id.clone(),
            entry.data.clone(),
            TaskMeta {
                priority: entry.priority,
            },
        )
        .with_claim(claim)))
    }

    fn release(&self, task: &Task) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        match state.taken.get(task.id()) {
            Some((_, claim)) if *claim == task.claim() => {
                state.taken.remove(task.id());
                Ok(())
            }
            _ => Err(QueueError::UnknownTask(task.id().to_string())),
        }
    }
}

#[async_trait]
impl Tube for MemoryTube {
    fn name(&self) -> &str {
        &self.name
    }

    async fn take(&self, timeout: Duration) -> Result<Option<Task>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            let next_event = match self.try_take()? {
                Ok(task) => return Ok(Some(task)),
                Err(next_event) => next_event,
            };

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wake_at = next_event.map_or(deadline, |at| at.min(deadline));
            let _ = tokio::time::timeout_at(wake_at, notified).await;
        }
    }

    async fn put(&self, data: Payload, options: PutOptions) -> Result<(), QueueError> {
        {
            let mut state = self.lock()?;
            state.seq += 1;
            let seq = state.seq;
            let id = format!("{}-{}", self.name, seq);
            state.entries.insert(
                id.clone(),
                Entry {
                    data,
                    priority: options.priority,
                    seq,
                },
            );
            if options.delay.is_zero() {
                state.make_ready(id);
            } else {
                state.delayed.push((Instant::now() + options.delay, id));
            }
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn ack(&self, task: Task) -> Result<(), QueueError> {
        self.release(&task)?;
        self.lock()?.entries.remove(task.id());
        Ok(())
    }

    async fn bury(&self, task: Task) -> Result<(), QueueError> {
        self.release(&task)?;
        self.lock()?.buried.insert(task.id().to_string());
        Ok(())
    }
}
