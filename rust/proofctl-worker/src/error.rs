use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn lean repl: {0}")]
    Spawn(std::io::Error),

    #[error("repl protocol error: {0}")]
    Protocol(String),

    #[error("repl process exited unexpectedly")]
    ProcessExited,

    #[error("pool is not accepting compiles right now (state: {0})")]
    NotReady(&'static str),

    #[error("restart token did not match")]
    BadRestartToken,
}
