use std::time::Duration;

use clap::Parser;
use proofctl_cli::init_tracing;
use proofctl_core::LlmWorkerRecord;
use reqwest::Client;
use tracing::{error, info, warn};

const STARTUP_DELAY: Duration = Duration::from_secs(300);
const RETRY_DELAY: Duration = Duration::from_secs(15);
const MAX_ATTEMPTS: u32 = 5;

/// Stand-alone registration tool for an LLM backend: waits for the backend
/// to finish booting, then registers it with the LLM gateway, retrying a
/// bounded number of times before giving up (unlike the compilation
/// worker's own unbounded registration retry loop — this is a one-shot CLI
/// invocation, not a long-running process that can just keep trying).
#[derive(Parser)]
struct Args {
    #[arg(long)]
    gateway_url: String,
    #[arg(long)]
    worker_url: String,
    #[arg(long)]
    model_name: String,
    #[arg(long)]
    model_path: String,
    #[arg(long, default_value_t = false)]
    skip_startup_delay: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    if !args.skip_startup_delay {
        info!(seconds = STARTUP_DELAY.as_secs(), "waiting for backend to finish booting");
        tokio::time::sleep(STARTUP_DELAY).await;
    }

    let client = Client::new();
    let record = LlmWorkerRecord {
        url: args.worker_url.clone(),
        model_name: args.model_name.clone(),
        model_path: args.model_path.clone(),
    };

    for attempt in 1..=MAX_ATTEMPTS {
        let result = client
            .post(format!("{}/register", args.gateway_url))
            .json(&record)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(model = %args.model_name, url = %args.worker_url, "registered with llm gateway");
                return;
            }
            Ok(resp) => warn!(attempt, status = %resp.status(), "gateway rejected registration"),
            Err(e) => warn!(attempt, error = %e, "could not reach gateway"),
        }
        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
    error!(attempts = MAX_ATTEMPTS, "giving up on llm worker registration");
    std::process::exit(1);
}
