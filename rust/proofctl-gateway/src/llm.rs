use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use proofctl_core::LlmWorkerRecord;
use reqwest::Client;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::roundrobin::next_index;

#[derive(Default)]
struct ModelPool {
    workers: Vec<LlmWorkerRecord>,
    cursor: usize,
}

pub struct LlmGatewayState {
    pools: Mutex<HashMap<String, ModelPool>>,
    client: Client,
}

impl LlmGatewayState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pools: Mutex::new(HashMap::new()),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client"),
        })
    }
}

pub fn router(state: Arc<LlmGatewayState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/workers", get(list_workers))
        .route("/v1/*path", any(forward))
        .with_state(state)
}

async fn register(
    State(state): State<Arc<LlmGatewayState>>,
    Json(record): Json<LlmWorkerRecord>,
) -> Result<StatusCode, GatewayError> {
    if record.url.is_empty() || record.model_name.is_empty() {
        return Err(GatewayError::BadRequest("url and model_name are required".into()));
    }
    let mut pools = state.pools.lock();
    let pool = pools.entry(record.model_name.clone()).or_default();
    if !pool.workers.iter().any(|w| w.url == record.url) {
        info!(model = %record.model_name, url = %record.url, "registered llm worker");
        pool.workers.push(record);
    }
    Ok(StatusCode::OK)
}

async fn list_workers(State(state): State<Arc<LlmGatewayState>>) -> Json<HashMap<String, Vec<LlmWorkerRecord>>> {
    let pools = state.pools.lock();
    Json(
        pools
            .iter()
            .map(|(model, pool)| (model.clone(), pool.workers.clone()))
            .collect(),
    )
}

async fn forward(
    State(state): State<Arc<LlmGatewayState>>,
    Path(path): Path<String>,
    body: axum::body::Bytes,
) -> Result<Response, GatewayError> {
    let mut value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::BadRequest(format!("request body is not valid JSON: {e}")))?;
    let model_name = value
        .get("model")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::BadRequest("request body must include a `model` field".into()))?
        .to_string();

    let (worker_url, model_path) = {
        let mut pools = state.pools.lock();
        let pool = pools.get_mut(&model_name).ok_or_else(|| GatewayError::UnknownModel(model_name.clone()))?;
        if pool.workers.is_empty() {
            return Err(GatewayError::NoWorkers);
        }
        let (index, next) = next_index(pool.workers.len(), pool.cursor);
        pool.cursor = next;
        let worker = &pool.workers[index];
        (worker.url.clone(), worker.model_path.clone())
    };

    if let Some(obj) = value.as_object_mut() {
        obj.insert("model".to_string(), serde_json::Value::String(model_path));
    }

    let upstream = state
        .client
        .post(format!("{worker_url}/{path}"))
        .json(&value)
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
    let stream = upstream.bytes_stream();
    Ok(Response::builder()
        .status(status)
        .body(Body::from_stream(stream))
        .expect("valid response builder"))
}

/// Pings every registered worker and evicts any that fail, dropping model
/// pools that become empty. Intended to run on a fixed interval.
pub async fn health_check(state: &LlmGatewayState) {
    let targets: Vec<(String, String)> = {
        let pools = state.pools.lock();
        pools
            .iter()
            .flat_map(|(model, pool)| pool.workers.iter().map(move |w| (model.clone(), w.url.clone())))
            .collect()
    };

    let mut dead = Vec::new();
    for (model, url) in targets {
        let healthy = state
            .client
            .get(format!("{url}/health"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        if !healthy {
            dead.push((model, url));
        }
    }

    if dead.is_empty() {
        return;
    }
    let mut pools = state.pools.lock();
    for (model, url) in dead {
        warn!(model = %model, url = %url, "evicting unhealthy llm worker");
        if let Some(pool) = pools.get_mut(&model) {
            pool.workers.retain(|w| w.url != url);
            pool.cursor = 0;
        }
    }
    pools.retain(|_, pool| !pool.workers.is_empty());
}
