use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("model `{0}` is not registered")]
    UnknownModel(String),

    #[error("no workers available")]
    NoWorkers,

    #[error("worker returned an error response: {0}")]
    WorkerError(String),

    #[error("could not reach worker: {0}")]
    WorkerUnreachable(String),

    #[error("worker request timed out")]
    WorkerTimeout,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::UnknownModel(_) => StatusCode::NOT_FOUND,
            GatewayError::NoWorkers => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::WorkerError(_) => StatusCode::FORBIDDEN,
            GatewayError::WorkerUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::WorkerTimeout => StatusCode::GATEWAY_TIMEOUT,
        };
        (status, self.to_string()).into_response()
    }
}
