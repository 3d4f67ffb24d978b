use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use proofctl_core::CompileWorkerRecord;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::roundrobin::next_index;

#[derive(Default)]
struct Pool {
    workers: Vec<CompileWorkerRecord>,
    cursor: usize,
}

pub struct CompileGatewayState {
    pool: Mutex<Pool>,
    client: Client,
}

impl CompileGatewayState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pool: Mutex::new(Pool::default()),
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("reqwest client"),
        })
    }
}

pub fn router(state: Arc<CompileGatewayState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/workers", get(list_workers))
        .route("/api/v1/compile", post(compile_batch))
        .route("/api/v1/compile_one", post(compile_one))
        .with_state(state)
}

async fn register(
    State(state): State<Arc<CompileGatewayState>>,
    Json(record): Json<CompileWorkerRecord>,
) -> Result<StatusCode, GatewayError> {
    if record.url.is_empty() {
        return Err(GatewayError::BadRequest("url is required".into()));
    }
    let mut pool = state.pool.lock();
    if !pool.workers.iter().any(|w| w.url == record.url) {
        info!(url = %record.url, "registered compile worker");
        pool.workers.push(record);
    }
    Ok(StatusCode::OK)
}

async fn list_workers(State(state): State<Arc<CompileGatewayState>>) -> Json<Vec<CompileWorkerRecord>> {
    Json(state.pool.lock().workers.clone())
}

async fn compile_batch(State(state): State<Arc<CompileGatewayState>>, Json(body): Json<Value>) -> Result<Json<Value>, GatewayError> {
    forward(&state, "/compile", body).await
}

async fn compile_one(State(state): State<Arc<CompileGatewayState>>, Json(body): Json<Value>) -> Result<Json<Value>, GatewayError> {
    forward(&state, "/compile_one", body).await
}

async fn forward(state: &CompileGatewayState, route: &str, body: Value) -> Result<Json<Value>, GatewayError> {
    let worker_url = {
        let mut pool = state.pool.lock();
        if pool.workers.is_empty() {
            return Err(GatewayError::NoWorkers);
        }
        let (index, next) = next_index(pool.workers.len(), pool.cursor);
        pool.cursor = next;
        pool.workers[index].url.clone()
    };

    let upstream = state
        .client
        .post(format!("{worker_url}{route}"))
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                GatewayError::WorkerTimeout
            } else {
                GatewayError::WorkerUnreachable(e.to_string())
            }
        })?;

    let status = upstream.status();
    if status.is_client_error() {
        return Err(GatewayError::WorkerError(format!("worker responded with {status}")));
    }
    let value: Value = upstream.json().await.map_err(|e| GatewayError::WorkerUnreachable(e.to_string()))?;
    Ok(Json(value))
}

/// Pings every registered worker and evicts any that fail.
pub async fn health_check(state: &CompileGatewayState) {
    let targets: Vec<String> = state.pool.lock().workers.iter().map(|w| w.url.clone()).collect();
    let mut dead = Vec::new();
    for url in targets {
        let healthy = state
            .client
            .get(format!("{url}/health"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        if !healthy {
            dead.push(url);
        }
    }
    if dead.is_empty() {
        return;
    }
    let mut pool = state.pool.lock();
    for url in dead {
        warn!(url = %url, "evicting unhealthy compile worker");
        pool.workers.retain(|w| w.url != url);
    }
    pool.cursor = 0;
}
