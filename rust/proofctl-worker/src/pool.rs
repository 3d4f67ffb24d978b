use std::sync::Arc;
use std::time::Duration;

use proofctl_core::CompilationResult;
use tokio::sync::{mpsc, oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::WorkerError;
use crate::repl::LeanRepl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Starting,
    Ready,
    Restarting,
    Stopping,
    Stopped,
}

impl PoolState {
    fn label(self) -> &'static str {
        match self {
            PoolState::Starting => "starting",
            PoolState::Ready => "ready",
            PoolState::Restarting => "restarting",
            PoolState::Stopping => "stopping",
            PoolState::Stopped => "stopped",
        }
    }
}

struct Job {
    batch_id: Uuid,
    index: usize,
    code: String,
    respond: oneshot::Sender<CompilationResult>,
}

struct Inner {
    job_tx: mpsc::Sender<Job>,
    shutdown_tx: watch::Sender<bool>,
    slots: Vec<JoinHandle<()>>,
    state: PoolState,
}

#[derive(Clone)]
pub struct PoolConfig {
    pub num_workers: usize,
    pub lake_path: String,
    pub lean_workspace: String,
}

/// The compilation worker's pool of task slots, each spawning a fresh
/// `lake exe repl` process per job. Compiles take the `RwLock` for reading
/// (any number run concurrently); a restart takes it for writing, so no
/// compile can start while the pool's slots are being torn down and
/// rebuilt, and any compile already in flight finishes first.
pub struct CompilerPool {
    inner: Arc<RwLock<Inner>>,
    config: PoolConfig,
}

impl CompilerPool {
    pub async fn start(config: PoolConfig) -> Self {
        let inner = build_inner(&config).await;
        CompilerPool {
            inner: Arc::new(RwLock::new(inner)),
            config,
        }
    }

    pub async fn state(&self) -> PoolState {
        self.inner.read().await.state
    }

    pub async fn queue_len_hint(&self, job_tx_capacity: usize) -> usize {
        let inner = self.inner.read().await;
        job_tx_capacity.saturating_sub(inner.job_tx.capacity())
    }

    /// Compiles `codes` as one logical batch: every entry is enqueued with
    /// a shared `batch_id` and its original index so results can be logged
    /// and returned in submission order even though the underlying slots
    /// pick jobs up out of order.
    pub async fn run_batch(&self, codes: Vec<String>) -> Result<Vec<CompilationResult>, WorkerError> {
        let guard = self.inner.read().await;
        if guard.state != PoolState::Ready {
            return Err(WorkerError::NotReady(guard.state.label()));
        }
        let batch_id = Uuid::new_v4();
        let mut receivers = Vec::with_capacity(codes.len());
        for (index, code) in codes.into_iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            guard
                .job_tx
                .send(Job {
                    batch_id,
                    index,
                    code,
                    respond: tx,
                })
                .await
                .map_err(|_| WorkerError::ProcessExited)?;
            receivers.push(rx);
        }
        drop(guard);

        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            let result = rx.await.map_err(|_| WorkerError::ProcessExited)?;
            results.push(result);
        }
        info!(%batch_id, count = results.len(), "compile batch finished");
        Ok(results)
    }

    pub async fn run_one(&self, code: String) -> Result<CompilationResult, WorkerError> {
        let mut results = self.run_batch(vec![code]).await?;
        Ok(results.remove(0))
    }

    /// Quiesces the current pool and replaces it with a fresh one. Compiles
    /// already in flight are allowed to finish; new compiles block on the
    /// write lock until this completes.
    pub async fn restart(&self) -> Result<(), WorkerError> {
        let mut guard = self.inner.write().await;
        guard.state = PoolState::Restarting;
        let _ = guard.shutdown_tx.send(true);
        for handle in guard.slots.drain(..) {
            if tokio::time::timeout(Duration::from_secs(30), handle).await.is_err() {
                warn!("compile slot did not shut down within timeout, abandoning it");
            }
        }
        let fresh = build_inner(&self.config).await;
        *guard = fresh;
        info!("compiler pool restarted");
        Ok(())
    }

    pub async fn shutdown(&self) {
        let mut guard = self.inner.write().await;
        guard.state = PoolState::Stopping;
        let _ = guard.shutdown_tx.send(true);
        for handle in guard.slots.drain(..) {
            let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
        }
        guard.state = PoolState::Stopped;
    }
}

async fn build_inner(config: &PoolConfig) -> Inner {
    let (job_tx, job_rx) = mpsc::channel::<Job>(config.num_workers * 4);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (shutdown_tx, _) = watch::channel(false);

    let mut slots = Vec::with_capacity(config.num_workers);
    for worker_id in 0..config.num_workers {
        let job_rx = job_rx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        let repl = LeanRepl::new(config.lake_path.clone(), config.lean_workspace.clone());
        slots.push(tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = job_rx.lock().await;
                    tokio::select! {
                        job = rx.recv() => job,
                        _ = shutdown_rx.changed() => None,
                    }
                };
                let Some(job) = job else { break };
                let result = match repl.verify(&job.code).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(worker_id, error = %e, "lean repl invocation failed");
                        CompilationResult::system_error(e.to_string())
                    }
                };
                info!(worker_id, batch_id = %job.batch_id, index = job.index, pass = result.pass, "compiled one task");
                let _ = job.respond.send(result);
            }
        }));
    }

    Inner {
        job_tx,
        shutdown_tx,
        slots,
        state: PoolState::Ready,
    }
}

/// Logs the pool's queue depth on a fixed interval. Runs until aborted.
pub async fn queue_monitor(pool: Arc<CompilerPool>, interval: Duration, capacity: usize) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let depth = pool.queue_len_hint(capacity).await;
        info!(depth, "compile queue depth");
    }
}
