use std::sync::Arc;

use clap::Parser;
use proofctl_cli::{env_or, env_parse_or, init_tracing};
use proofctl_scheduler::{inference_router, InferenceScheduler};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Inference scheduler: a priority queue and bounded worker pool in front
/// of the LLM gateway.
#[derive(Parser)]
struct Args {
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    gateway_url: Option<String>,
    #[arg(long)]
    num_workers: Option<usize>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    let bind = args.bind.unwrap_or_else(|| env_or("SCHEDULER_BIND", "0.0.0.0:8001"));
    let gateway_url = args.gateway_url.unwrap_or_else(|| env_or("GATEWAY_URL", "http://127.0.0.1:8000"));
    let num_workers = args.num_workers.unwrap_or_else(|| env_parse_or("SCHEDULER_WORKERS", 32));

    let (scheduler, _workers) = InferenceScheduler::start(gateway_url, num_workers);
    let app = inference_router(Arc::new(scheduler)).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&bind).await.expect("bind scheduler address");
    info!(%bind, "inference scheduler listening");
    axum::serve(listener, app).await.expect("scheduler server error");
}
