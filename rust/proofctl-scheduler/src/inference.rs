use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proofctl_core::{InferenceResult, PriorityTask, TaskError, TokenUsage};
use reqwest::Client;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::Notify;
use tracing::{info, warn};

/// One inference call: `model` selects the LLM gateway's worker pool,
/// `payload` is forwarded to the backend verbatim with `model` substituted
/// in by the gateway (see `proofctl-gateway`).
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub payload: serde_json::Value,
}

type Heap = BinaryHeap<Reverse<PriorityTask<InferenceRequest, InferenceResult>>>;

/// Bounded worker pool fronting the LLM gateway with a priority queue.
/// Exactly one HTTP attempt per task; no retry — a failed upstream call
/// resolves the task's result slot with `Err` and the scheduler moves on.
pub struct InferenceScheduler {
    queue: Arc<AsyncMutex<Heap>>,
    notify: Arc<Notify>,
    sequence: Arc<AtomicU64>,
    gateway_url: Arc<str>,
    client: Client,
}

impl InferenceScheduler {
    /// Spawns `num_workers` dequeue loops and returns the handle used to
    /// submit tasks. The workers run for the lifetime of the returned
    /// `JoinHandle`s; dropping the scheduler does not stop them (callers
    /// that want shutdown should abort the handles explicitly).
    pub fn start(gateway_url: impl Into<String>, num_workers: usize) -> (Self, Vec<tokio::task::JoinHandle<()>>) {
        let scheduler = InferenceScheduler {
            queue: Arc::new(AsyncMutex::new(BinaryHeap::new())),
            notify: Arc::new(Notify::new()),
            sequence: Arc::new(AtomicU64::new(0)),
            gateway_url: Arc::from(gateway_url.into()),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client"),
        };
        let handles = (0..num_workers)
            .map(|id| scheduler.spawn_worker(id))
            .collect();
        (scheduler, handles)
    }

    fn spawn_worker(&self, worker_id: usize) -> tokio::task::JoinHandle<()> {
        let queue = self.queue.clone();
        let notify = self.notify.clone();
        let gateway_url = self.gateway_url.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            loop {
                let task = {
                    let mut q = queue.lock().await;
                    q.pop()
                };
                let Reverse(task) = match task {
                    Some(t) => t,
                    None => {
                        notify.notified().await;
                        continue;
                    }
                };
                if task.is_abandoned() {
                    continue;
                }
                let result = dispatch(&client, &gateway_url, &task.payload).await;
                if let Err(ref e) = result {
                    warn!(worker_id, error = %e, "inference dispatch failed");
                }
                let _ = task.result_tx.send(result);
            }
        })
    }

    pub async fn submit(&self, request: InferenceRequest, priority: i64) -> Result<InferenceResult, TaskError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let (task, rx) = PriorityTask::new(request, priority, sequence);
        self.queue.lock().await.push(Reverse(task));
        self.notify.notify_one();
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Cancelled),
        }
    }
}

async fn dispatch(client: &Client, gateway_url: &str, request: &InferenceRequest) -> Result<InferenceResult, TaskError> {
    let mut body = request.payload.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.insert("model".to_string(), serde_json::Value::String(request.model.clone()));
    }
    let resp = client
        .post(format!("{gateway_url}/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                TaskError::Timeout(Duration::from_secs(120))
            } else {
                TaskError::Upstream(e.to_string())
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(TaskError::Upstream(format!("gateway returned status {status}")));
    }
    let value: serde_json::Value = resp.json().await.map_err(|e| TaskError::Upstream(e.to_string()))?;
    parse_inference_response(value)
}

fn parse_inference_response(value: serde_json::Value) -> Result<InferenceResult, TaskError> {
    let content = value
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let usage = value.get("usage");
    let field = |name: &str| usage.and_then(|u| u.get(name)).and_then(|v| v.as_u64()).unwrap_or(0);
    let usage = TokenUsage {
        prompt_tokens: field("prompt_tokens"),
        completion_tokens: field("completion_tokens"),
        total_tokens: field("total_tokens"),
    };
    info!(total_tokens = usage.total_tokens, "inference call completed");
    Ok(InferenceResult { content, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openai_shaped_response() {
        let value = serde_json::json!({
            "choices": [{"message": {"content": "theorem foo := trivial"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let result = parse_inference_response(value).unwrap();
        assert_eq!(result.content, "theorem foo := trivial");
        assert_eq!(result.usage.total_tokens, 15);
    }
}
