//! Shared data model for the proofctl control plane: queued tasks, inference
//! and compilation results, and worker registry records.

pub mod error;
pub mod result;
pub mod task;
pub mod worker;

pub use error::TaskError;
pub use result::{CompilationResult, ErrorMessage, InferenceResult, Position, TokenUsage};
pub use task::{FifoTask, PriorityTask};
pub use worker::{CompileWorkerRecord, LlmWorkerRecord};
