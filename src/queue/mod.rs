//! Task queue contract and backends.
//!
//! The checker and the pusher only ever talk to a `Tube`: a named durable
//! queue with take / ack / bury / put (delay, priority). A taken task is
//! invisible to other takers until it is acked, buried, or its claim expires.
//!
//! Backends:
//! - `RedisTube`: durable, shared between processes
//! - `MemoryTube`: in-process, for tests and single-process runs

mod memory;
mod redis_tube;
mod task;

use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::QueueError;
use crate::models::Payload;

// Re-export public API
pub use memory::{MemoryTube, TubeStats};
pub use redis_tube::RedisTube;
pub use task::{PutOptions, Task, TaskMeta, DEFAULT_PRIORITY};

/// A named durable queue.
#[async_trait]
pub trait Tube: Send + Sync {
    /// Tube name, for logging.
    fn name(&self) -> &str;

    /// Claims the next ready task, waiting up to `timeout` for one.
    async fn take(&self, timeout: Duration) -> Result<Option<Task>, QueueError>;

    /// Enqueues a new task.
    async fn put(&self, data: Payload, options: PutOptions) -> Result<(), QueueError>;

    /// Marks a claimed task as done and removes it.
    ///
    /// # Errors
    ///
    /// `QueueError::Durability` when the backing store is unreachable; the
    /// task then stays claimed until its claim expires.
    async fn ack(&self, task: Task) -> Result<(), QueueError>;

    /// Sets a claimed task aside as failed.
    ///
    /// # Errors
    ///
    /// Same failure mode as `ack`.
    async fn bury(&self, task: Task) -> Result<(), QueueError>;
}

/// Terminal action for a claimed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TaskAction {
    Ack,
    Bury,
}

impl TaskAction {
    /// Hands `task` back to `tube` with this action.
    pub async fn apply<T>(self, tube: &T, task: Task) -> Result<(), QueueError>
    where
        T: Tube + ?Sized,
    {
        match self {
            TaskAction::Ack => tube.ack(task).await,
            TaskAction::Bury => tube.bury(task).await,
        }
    }
}
