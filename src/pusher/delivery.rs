//! One callback delivery.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::Payload;
use crate::queue::{Task, TaskAction};

/// A delivered task and what to do with it on its tube.
pub type Completion = (Task, TaskAction);

/// Copy of the task payload sent to the callback, without the task's `id`.
pub fn callback_body(data: &Payload) -> Payload {
    let mut body = data.clone();
    body.remove("id");
    body
}

/// POSTs the task payload as JSON to its `callback_url`.
///
/// Sends `(task, Ack)` on `completion` once the request went through, whatever
/// the response status, and `(task, Bury)` when the request itself failed or
/// the payload has no `callback_url`. Never retries.
pub async fn notification_worker(
    client: &reqwest::Client,
    task: Task,
    completion: &UnboundedSender<Completion>,
) {
    let action = match task.data().get("callback_url").and_then(Value::as_str) {
        None => {
            log::warn!("Task {} has no callback_url", task.id());
            TaskAction::Bury
        }
        Some(callback_url) => {
            log::info!("Send data to callback url {} for task {}", callback_url, task.id());
            let result = client
                .post(callback_url)
                .header(CONTENT_TYPE, "application/json")
                .json(&callback_body(task.data()))
                .send()
                .await;
            match result {
                Ok(response) => {
                    log::info!(
                        "Callback {} answered {} for task {}",
                        callback_url,
                        response.status(),
                        task.id()
                    );
                    TaskAction::Ack
                }
                Err(e) => {
                    log::error!("Callback {} failed for task {}: {}", callback_url, task.id(), e);
                    TaskAction::Bury
                }
            }
        }
    };

    let id = task.id().to_string();
    if completion.send((task, action)).is_err() {
        log::error!("Completion queue closed, task {} left to claim expiry", id);
    }
}
