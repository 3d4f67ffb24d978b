use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proofctl_core::{CompilationResult, FifoTask, TaskError};
use reqwest::Client;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    pub code: String,
    /// Declaration name this job targets, if known — echoed back by the
    /// worker alongside its result rather than used for compilation itself.
    pub name: Option<String>,
    /// Caller-supplied import/open block, echoed back unchanged.
    pub header: Option<String>,
}

type Heap = BinaryHeap<Reverse<FifoTask<CompileRequest, CompilationResult>>>;

/// Bounded worker pool fronting the compilation gateway with a plain FIFO
/// queue — compile jobs have no notion of priority in this system.
pub struct CompilationScheduler {
    queue: Arc<AsyncMutex<Heap>>,
    notify: Arc<Notify>,
    sequence: Arc<AtomicU64>,
    gateway_url: Arc<str>,
    client: Client,
}

impl CompilationScheduler {
    pub fn start(gateway_url: impl Into<String>, num_workers: usize) -> (Self, Vec<tokio::task::JoinHandle<()>>) {
        let scheduler = CompilationScheduler {
            queue: Arc::new(AsyncMutex::new(BinaryHeap::new())),
            notify: Arc::new(Notify::new()),
            sequence: Arc::new(AtomicU64::new(0)),
            gateway_url: Arc::from(gateway_url.into()),
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("reqwest client"),
        };
        let handles = (0..num_workers).map(|id| scheduler.spawn_worker(id)).collect();
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
                    warn!(worker_id, error = %e, "compilation dispatch failed");
                }
                let _ = task.result_tx.send(result);
            }
        })
    }

    pub async fn submit(&self, request: CompileRequest) -> Result<CompilationResult, TaskError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let (task, rx) = FifoTask::new(request, sequence);
        self.queue.lock().await.push(Reverse(task));
        self.notify.notify_one();
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Cancelled),
        }
    }
}

#[derive(serde::Deserialize)]
struct CompileOneResponse {
    compilation_result: CompilationResult,
}

async fn dispatch(client: &Client, gateway_url: &str, request: &CompileRequest) -> Result<CompilationResult, TaskError> {
    let resp = client
        .post(format!("{gateway_url}/api/v1/compile_one"))
        .json(&serde_json::json!({
            "code": request.code,
            "name": request.name,
            "header": request.header,
        }))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                TaskError::Timeout(Duration::from_secs(300))
            } else {
                TaskError::Upstream(e.to_string())
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(TaskError::Upstream(format!("gateway returned status {status}")));
    }
    resp.json::<CompileOneResponse>()
        .await
        .map(|body| body.compilation_result)
        .map_err(|e| TaskError::Upstream(e.to_string()))
}
