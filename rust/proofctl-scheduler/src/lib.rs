//! Priority (inference) and FIFO (compilation) schedulers, each a bounded
//! worker pool making a single HTTP attempt per task against its gateway.

pub mod compilation;
pub mod error;
pub mod inference;
pub mod server;

pub use compilation::{CompilationScheduler, CompileRequest};
pub use error::SchedulerError;
pub use inference::{InferenceRequest, InferenceScheduler};
pub use server::{compilation_router, inference_router};
