use thiserror::Error;

/// Error delivered through a task's result slot when it cannot be completed.
#[derive(Debug, Error, Clone)]
pub enum TaskError {
    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("no workers available")]
    NoWorkers,

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("task was cancelled before it ran")]
    Cancelled,
}
