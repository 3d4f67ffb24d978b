use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use proofctl_core::CompilationResult;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::pool::CompilerPool;

pub struct WorkerState {
    pub pool: Arc<CompilerPool>,
    pub restart_token: String,
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkerError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            WorkerError::BadRestartToken => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

pub fn router(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/compile", post(compile_batch))
        .route("/compile_one", post(compile_one))
        .route("/restart_pool", post(restart_pool))
        .with_state(state)
}

async fn health(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    let pool_state = state.pool.state().await;
    Json(serde_json::json!({ "status": "ok", "pool_state": format!("{pool_state:?}") }))
}

#[derive(Deserialize)]
struct CompileBatchRequest {
    codes: Vec<String>,
}

async fn compile_batch(
    State(state): State<Arc<WorkerState>>,
    Json(request): Json<CompileBatchRequest>,
) -> Result<Json<Vec<CompilationResult>>, WorkerError> {
    Ok(Json(state.pool.run_batch(request.codes).await?))
}

#[derive(Deserialize)]
struct CompileOneRequest {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    header: Option<String>,
}

#[derive(serde::Serialize)]
struct CompileOneResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<String>,
    code: String,
    compilation_result: CompilationResult,
}

async fn compile_one(
    State(state): State<Arc<WorkerState>>,
    Json(request): Json<CompileOneRequest>,
) -> Result<Json<CompileOneResponse>, WorkerError> {
    let compilation_result = state.pool.run_one(request.code.clone()).await?;
    Ok(Json(CompileOneResponse {
        name: request.name,
        header: request.header,
        code: request.code,
        compilation_result,
    }))
}

#[derive(Deserialize)]
struct RestartQuery {
    token: String,
}

async fn restart_pool(State(state): State<Arc<WorkerState>>, Query(query): Query<RestartQuery>) -> Result<StatusCode, WorkerError> {
    if query.token != state.restart_token {
        return Err(WorkerError::BadRestartToken);
    }
    state.pool.restart().await?;
    Ok(StatusCode::OK)
}

/// Registers this worker with the compilation gateway, retrying every 5
/// seconds forever until it succeeds — the gateway may not be up yet when
/// the worker starts.
pub async fn register_with_gateway(client: &Client, gateway_url: &str, self_url: &str) {
    loop {
        let result = client
            .post(format!("{gateway_url}/register"))
            .json(&serde_json::json!({ "url": self_url }))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(self_url, "registered with compilation gateway");
                return;
            }
            Ok(resp) => warn!(status = %resp.status(), "gateway rejected registration, retrying"),
            Err(e) => warn!(error = %e, "could not reach gateway, retrying"),
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
