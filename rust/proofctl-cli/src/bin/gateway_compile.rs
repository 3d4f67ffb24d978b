use std::time::Duration;

use clap::Parser;
use proofctl_cli::{env_or, env_parse_or, init_tracing};
use proofctl_gateway::{compile, compile_router, spawn_health_loop, CompileGatewayState};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Compilation gateway: one flat round-robin pool of compile workers.
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
    let bind = args.bind.unwrap_or_else(|| env_or("GATEWAY_BIND", "0.0.0.0:8100"));
    let health_interval = args
        .health_interval_secs
        .unwrap_or_else(|| env_parse_or("HEALTH_INTERVAL_SECS", 30));

    let state = CompileGatewayState::new();
    spawn_health_loop(state.clone(), Duration::from_secs(health_interval), |s| async move {
        compile::health_check(&s).await;
    });

    let app = compile_router(state).layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&bind).await.expect("bind gateway address");
    info!(%bind, "compilation gateway listening");
    axum::serve(listener, app).await.expect("gateway server error");
}
