//! The two HTTP gateways: an LLM gateway keyed by friendly model name with
//! per-model round-robin pools, and a compilation gateway with one flat
//! round-robin pool. Both support dynamic worker registration and evict
//! unhealthy workers on a periodic timer.

pub mod compile;
pub mod error;
pub mod llm;
pub mod roundrobin;

pub use compile::{router as compile_router, CompileGatewayState};
pub use error::GatewayError;
pub use llm::{router as llm_router, LlmGatewayState};

use std::sync::Arc;
use std::time::Duration;

/// Spawns a task that calls `check` every `interval`, forever. Returns the
/// handle so the caller can abort it on shutdown.
pub fn spawn_health_loop<S, F, Fut>(state: Arc<S>, interval: Duration, check: F) -> tokio::task::JoinHandle<()>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            check(state.clone()).await;
        }
    })
}
