//! Maps queue tasks onto redirect walks and walk outcomes back onto payloads.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::history::{get_redirect_history, WalkOptions};
use crate::models::Payload;
use crate::queue::Task;
use crate::resolve::Resolver;

/// Outcome of checking one task: `(needs_recheck, payload)`.
///
/// `needs_recheck == true` carries the task's own payload, to be requeued;
/// otherwise the payload is a fresh result record.
pub type CheckOutcome = (bool, Payload);

/// Runs the check for one task.
#[async_trait]
pub trait TaskChecker: Send + Sync {
    /// `None` means there is nothing to do for this task and it should just be acked.
    async fn check(&self, task: &Task) -> Option<CheckOutcome>;
}

/// `TaskChecker` walking the redirect chain of the task's `url`.
pub struct HistoryChecker<R> {
    resolver: R,
    options: WalkOptions,
}

impl<R: Resolver> HistoryChecker<R> {
    pub fn new(resolver: R, options: WalkOptions) -> Self {
        Self { resolver, options }
    }
}

#[async_trait]
impl<R: Resolver> TaskChecker for HistoryChecker<R> {
    async fn check(&self, task: &Task) -> Option<CheckOutcome> {
        get_redirect_history_from_task(&self.resolver, task, &self.options).await
    }
}

/// Walks the redirect chain of `task.data()["url"]`.
///
/// Returns `None` when the task carries no usable `url`. A walk that ended on a
/// failed fetch returns `(true, task data)` unchanged; any other walk returns
/// `(false, record)` with `url`, `url_id`, `recheck`, `suspicious` (only when
/// the task has it), `urls`, `types` and `counters`.
pub async fn get_redirect_history_from_task<R>(
    resolver: &R,
    task: &Task,
    options: &WalkOptions,
) -> Option<CheckOutcome>
where
    R: Resolver + ?Sized,
{
    let data = task.data();
    let Some(url) = data.get("url").and_then(Value::as_str) else {
        log::warn!("Task {} has no url, skipping", task.id());
        return None;
    };

    log::info!("Checking url {} of task {}", url, task.id());
    let history = get_redirect_history(resolver, url, options).await;

    if history.is_error() {
        log::info!("Url {} of task {} will be rechecked", url, task.id());
        return Some((true, data.clone()));
    }

    let mut record = Payload::new();
    record.insert("url".to_string(), Value::String(url.to_string()));
    record.insert(
        "url_id".to_string(),
        data.get("url_id").cloned().unwrap_or(Value::Null),
    );
    record.insert(
        "recheck".to_string(),
        Value::Bool(data.get("recheck").and_then(Value::as_bool).unwrap_or(false)),
    );
    if let Some(suspicious) = data.get("suspicious") {
        record.insert("suspicious".to_string(), suspicious.clone());
    }
    record.insert("urls".to_string(), json!(history.urls));
    record.insert("types".to_string(), json!(history.types));
    record.insert("counters".to_string(), json!(history.counters));

    Some((false, record))
}
