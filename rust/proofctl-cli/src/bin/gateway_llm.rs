use std::time::Duration;

use clap::Parser;
use proofctl_cli::{env_or, env_parse_or, init_tracing};
use proofctl_gateway::{llm, llm_router, spawn_health_loop, LlmGatewayState};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// LLM gateway: accepts worker registrations and round-robins requests
/// across the pool registered for each model name.
#[derive(Parser)]
struct Args {
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    health_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    let bind = args.bind.unwrap_or_else(|| env_or("GATEWAY_BIND", "0.0.0.0:8000"));
    let health_interval = args
        .health_interval_secs
        .unwrap_or_else(|| env_parse_or("HEALTH_INTERVAL_SECS", 60));

    let state = LlmGatewayState::new();
    spawn_health_loop(state.clone(), Duration::from_secs(health_interval), |s| async move {
        llm::health_check(&s).await;
    });

    let app = llm_router(state).layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&bind).await.expect("bind gateway address");
    info!(%bind, "llm gateway listening");
    axum::serve(listener, app).await.expect("gateway server error");
}
