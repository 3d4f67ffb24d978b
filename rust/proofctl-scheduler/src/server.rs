use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use proofctl_core::{CompilationResult, InferenceResult, TaskError};
use serde::Deserialize;

use crate::compilation::{CompilationScheduler, CompileRequest};
use crate::inference::{InferenceRequest, InferenceScheduler};

struct TaskErrorResponse(TaskError);

impl IntoResponse for TaskErrorResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TaskError::NoWorkers => StatusCode::SERVICE_UNAVAILABLE,
            TaskError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            TaskError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            TaskError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct InferRequestBody {
    pub model: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: i64,
}

pub fn inference_router(scheduler: Arc<InferenceScheduler>) -> Router {
    Router::new().route("/infer", post(infer)).with_state(scheduler)
}

async fn infer(
    State(scheduler): State<Arc<InferenceScheduler>>,
    Json(body): Json<InferRequestBody>,
) -> Result<Json<InferenceResult>, TaskErrorResponse> {
    scheduler
        .submit(
            InferenceRequest {
                model: body.model,
                payload: body.payload,
            },
            body.priority,
        )
        .await
        .map(Json)
        .map_err(TaskErrorResponse)
}

#[derive(Deserialize)]
pub struct CompileRequestBody {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
}

#[derive(serde::Serialize)]
pub struct CompileResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub code: String,
    pub compilation_result: CompilationResult,
}

pub fn compilation_router(scheduler: Arc<CompilationScheduler>) -> Router {
    Router::new().route("/compile", post(compile)).with_state(scheduler)
}

async fn compile(
    State(scheduler): State<Arc<CompilationScheduler>>,
    Json(body): Json<CompileRequestBody>,
) -> Result<Json<CompileResponseBody>, TaskErrorResponse> {
    let CompileRequestBody { code, name, header } = body;
    let compilation_result = scheduler
        .submit(CompileRequest {
            code: code.clone(),
            name: name.clone(),
            header: header.clone(),
        })
        .await
        .map_err(TaskErrorResponse)?;
    Ok(Json(CompileResponseBody {
        name,
        header,
        code,
        compilation_result,
    }))
}
