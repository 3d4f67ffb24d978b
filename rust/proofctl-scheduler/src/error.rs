use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("gateway returned malformed response: {0}")]
    MalformedResponse(String),

    #[error("scheduler queue is shut down")]
    ShuttingDown,
}
