//! The compilation worker: a pool of task slots that each spawn a fresh
//! `lake exe repl` subprocess per job, batch dispatch, and a mutex-guarded
//! graceful restart protocol.

pub mod error;
pub mod pool;
pub mod repl;
pub mod server;

pub use error::WorkerError;
pub use pool::{CompilerPool, PoolConfig, PoolState};
pub use repl::LeanRepl;
pub use server::{register_with_gateway, router, WorkerState};
