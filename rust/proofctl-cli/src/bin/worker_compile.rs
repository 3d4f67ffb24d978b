use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use proofctl_cli::{env_or, env_parse_or, init_tracing};
use proofctl_worker::pool::queue_monitor;
use proofctl_worker::{router, CompilerPool, PoolConfig, WorkerState};
use reqwest::Client;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Compilation worker: a pool of task slots, each spawning a fresh Lean
/// REPL subprocess per job, behind a restart-safe HTTP surface.
#[derive(Parser)]
struct Args {
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    self_url: Option<String>,
    #[arg(long)]
    gateway_url: Option<String>,
    #[arg(long)]
    num_workers: Option<usize>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    let bind = args.bind.unwrap_or_else(|| env_or("WORKER_BIND", "0.0.0.0:8200"));
    let self_url = args.self_url.unwrap_or_else(|| env_or("WORKER_URL", "http://127.0.0.1:8200"));
    let gateway_url = args.gateway_url.unwrap_or_else(|| env_or("GATEWAY_URL", "http://127.0.0.1:8100"));
    let num_workers = args
        .num_workers
        .unwrap_or_else(|| env_parse_or("SLURM_CPUS_PER_TASK", num_cpus_fallback()));
    let lake_path = env_or("LAKE_PATH", "lake");
    let lean_workspace = env_or("LEAN_WORKSPACE", ".");
    let restart_token = env_or("RESTART_TOKEN", "changeme");

    let pool = CompilerPool::start(PoolConfig {
        num_workers,
        lake_path,
        lean_workspace,
    })
    .await;
    let pool = Arc::new(pool);
    tokio::spawn(queue_monitor(pool.clone(), Duration::from_secs(30), num_workers * 4));

    let restart_pool = pool.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(180));
        loop {
            ticker.tick().await;
            if let Err(e) = restart_pool.restart().await {
                tracing::warn!(error = %e, "periodic pool restart failed");
            }
        }
    });

    let state = Arc::new(WorkerState {
        pool: pool.clone(),
        restart_token,
    });

    let client = Client::new();
    let gateway_url_clone = gateway_url.clone();
    let self_url_clone = self_url.clone();
    tokio::spawn(async move {
        proofctl_worker::register_with_gateway(&client, &gateway_url_clone, &self_url_clone).await;
    });

    let app = router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&bind).await.expect("bind worker address");
    info!(%bind, "compilation worker listening");
    axum::serve(listener, app).await.expect("worker server error");
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
