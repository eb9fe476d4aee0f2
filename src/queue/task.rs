//! Queue task values.

use std::time::Duration;

use crate::models::Payload;

/// Priority used when a task is put without one. Lower values are served first.
pub const DEFAULT_PRIORITY: u32 = 1024;

/// Scheduling metadata attached to a task by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMeta {
    pub priority: u32,
}

/// A task claimed from a tube.
///
/// The holder owns the claim until it hands the task back with `ack` or
/// `bury`; both consume the value. Each take issues a fresh claim token, so a
/// holder whose claim expired cannot release the task for the next holder.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: String,
    data: Payload,
    meta: TaskMeta,
    claim: u64,
}

impl Task {
    pub fn new(id: impl Into<String>, data: Payload, meta: TaskMeta) -> Self {
        Self {
            id: id.into(),
            data,
            meta,
            claim: 0,
        }
    }

    /// Attaches the claim token issued by the tube on take.
    pub fn with_claim(mut self, claim: u64) -> Self {
        self.claim = claim;
        self
    }

    pub fn claim(&self) -> u64 {
        self.claim
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn meta(&self) -> TaskMeta {
        self.meta
    }
}

/// How a new task is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    /// Time before the task becomes takeable
    pub delay: Duration,
    pub priority: u32,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl PutOptions {
    pub fn delayed(delay: Duration, priority: u32) -> Self {
        Self { delay, priority }
    }
}
