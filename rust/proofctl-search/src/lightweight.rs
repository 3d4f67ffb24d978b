use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use proofctl_analysis::{DefaultOutputPolicy, OutputPolicy};
use proofctl_core::TokenUsage;
use proofctl_scheduler::{CompilationScheduler, CompileRequest, InferenceRequest, InferenceScheduler};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::templates::{build_initial_prompt, build_revision_prompt, format_errors};

/// One lightweight pass: an initial attempt followed by up to
/// `num_revisions` repair attempts, each re-prompting with the previous
/// attempt and its compiler errors. Stops as soon as one attempt compiles,
/// or cooperatively once `cancel` is set by a sibling pass that already
/// succeeded — checked between rounds so a round already in flight always
/// finishes and banks its token usage first.
#[allow(clippy::too_many_arguments)]
async fn lightweight_inference_single(
    inference: &InferenceScheduler,
    compilation: &CompilationScheduler,
    model: &str,
    goal_signature: &str,
    facts: &[String],
    num_revisions: usize,
    base_priority: i64,
    cancel: CancellationToken,
    shared_usage: Arc<AsyncMutex<TokenUsage>>,
) -> Option<String> {
    let policy = DefaultOutputPolicy;
    let mut current_code: Option<String> = None;
    let mut last_errors = String::new();

    for round in 0..=num_revisions {
        if cancel.is_cancelled() {
            return None;
        }

        let prompt = match &current_code {
            None => build_initial_prompt(goal_signature, facts),
            Some(previous) => build_revision_prompt(goal_signature, previous, &last_errors),
        };
        let priority = if round == 0 {
            base_priority
        } else {
            base_priority - round as i64 - 1
        };

        let inference_result = inference
            .submit(
                InferenceRequest {
                    model: model.to_string(),
                    payload: serde_json::json!({ "messages": [{"role": "user", "content": prompt}] }),
                },
                priority,
            )
            .await
            .ok()?;
        shared_usage.lock().await.accumulate(&inference_result.usage);

        if cancel.is_cancelled() {
            return None;
        }

        let extracted = policy.extract_proof(&inference_result.content, goal_signature);
        let compile_result = compilation
            .submit(CompileRequest {
                code: extracted.code.clone(),
                name: None,
                header: None,
            })
            .await
            .ok()?;

        if compile_result.complete {
            info!(round, "lightweight pass succeeded");
            return Some(extracted.code);
        }

        last_errors = format_errors(&compile_result.errors);
        current_code = Some(extracted.code);
    }
    None
}

/// Runs `num_passes` independent lightweight passes concurrently and
/// returns the first one to produce a compiling proof, plus the combined
/// token usage of every pass including the ones that lost the race — a
/// cancelled pass still banks whatever usage it accumulated before
/// noticing the cancellation.
#[allow(clippy::too_many_arguments)]
pub async fn lightweight_inference(
    inference: &InferenceScheduler,
    compilation: &CompilationScheduler,
    model: &str,
    goal_signature: &str,
    facts: &[String],
    problem_index: usize,
    num_passes: usize,
    num_revisions: usize,
) -> (Option<String>, TokenUsage) {
    let base_priority = problem_index as i64 * 16;
    let cancel = CancellationToken::new();
    let shared_usage = Arc::new(AsyncMutex::new(TokenUsage::default()));

    let mut passes = FuturesUnordered::new();
    for _ in 0..num_passes {
        let cancel = cancel.clone();
        let shared_usage = shared_usage.clone();
        passes.push(lightweight_inference_single(
            inference,
            compilation,
            model,
            goal_signature,
            facts,
            num_revisions,
            base_priority,
            cancel,
            shared_usage,
        ));
    }

    let mut winner = None;
    while let Some(result) = passes.next().await {
        if let Some(code) = result {
            winner = Some(code);
            cancel.cancel();
            break;
        }
    }
    while passes.next().await.is_some() {}

    let usage = *shared_usage.lock().await;
    (winner, usage)
}
