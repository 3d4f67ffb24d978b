use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use proofctl_analysis::{AnalysisError, DefaultOutputPolicy, LeanVerifier, OutputPolicy, ProofAnalysis};
use proofctl_core::{CompilationResult, TokenUsage};
use proofctl_scheduler::{CompilationScheduler, CompileRequest, InferenceRequest, InferenceScheduler};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::lightweight::lightweight_inference;
use crate::templates::build_initial_prompt;

/// The inner lightweight-fix fan-out always uses 4 passes, independent of
/// the outer mediumweight call's own `num_passes` — carried over from the
/// system this is modeled on, which hardcodes the per-lemma repair fan-out
/// rather than threading the caller's pass count through.
const LEMMA_FIX_PASSES: usize = 4;

struct SchedulerVerifier<'a> {
    compilation: &'a CompilationScheduler,
}

impl<'a> LeanVerifier for SchedulerVerifier<'a> {
    fn verify<'b>(&'b self, code: &'b str) -> BoxFuture<'b, Result<CompilationResult, AnalysisError>> {
        Box::pin(async move {
            self.compilation
                .submit(CompileRequest {
                    code: code.to_string(),
                    name: None,
                    header: None,
                })
                .await
                .map_err(|e| AnalysisError::Verifier(e.to_string()))
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn mediumweight_inference_single(
    inference: &InferenceScheduler,
    compilation: &CompilationScheduler,
    model: &str,
    header: &str,
    target_name: &str,
    target_signature: &str,
    num_revisions: usize,
    base_priority: i64,
    cancel: CancellationToken,
    shared_usage: Arc<AsyncMutex<TokenUsage>>,
    shared_lemma_collection: Arc<AsyncMutex<Vec<String>>>,
) -> Option<String> {
    if cancel.is_cancelled() {
        return None;
    }

    let prompt = build_initial_prompt(target_signature, &[]);
    let inference_result = inference
        .submit(
            InferenceRequest {
                model: model.to_string(),
                payload: serde_json::json!({ "messages": [{"role": "user", "content": prompt}] }),
            },
            base_priority,
        )
        .await
        .ok()?;
    shared_usage.lock().await.accumulate(&inference_result.usage);

    let policy = DefaultOutputPolicy;
    let extracted = policy.extract_proof(&inference_result.content, target_signature);
    let whole_proof_result = compilation
        .submit(CompileRequest {
            code: format!("{header}\n{}", extracted.code),
            name: Some(target_name.to_string()),
            header: Some(header.to_string()),
        })
        .await
        .ok()?;
    if whole_proof_result.complete {
        info!(target_name, "mediumweight initial attempt succeeded outright");
        return Some(extracted.code);
    }

    if cancel.is_cancelled() {
        return None;
    }

    let source = format!("{header}\n{}", extracted.code);
    let mut analysis = ProofAnalysis::from_source(&source);
    let verifier = SchedulerVerifier { compilation };
    if analysis.verify_all_lemmas(&verifier).await.is_err() {
        return None;
    }
    let fully_correct = analysis.fully_correct_lemmas();
    {
        let mut collection = shared_lemma_collection.lock().await;
        collection.extend(fully_correct.iter().cloned());
    }

    let failing: Vec<String> = analysis
        .declarations_in_order()
        .filter(|d| d.kind.is_provable() && !fully_correct.contains(&d.name))
        .map(|d| d.name.clone())
        .collect();

    // If every lemma verified in isolation but the whole file still
    // doesn't compile, the target itself is the only thing broken — it
    // gets folded into `to_fix` below like any other failing lemma.
    let to_fix: Vec<String> = if failing.contains(&target_name.to_string()) {
        failing
    } else {
        let mut f = failing;
        f.push(target_name.to_string());
        f
    };

    for lemma_name in &to_fix {
        if cancel.is_cancelled() {
            return None;
        }
        let subproblem = match analysis.construct_subproblem(lemma_name) {
            Ok(s) => s,
            Err(_) => return None,
        };
        let (fixed_code, usage) = lightweight_inference(
            inference,
            compilation,
            model,
            &subproblem.code,
            &subproblem.facts,
            0,
            LEMMA_FIX_PASSES,
            num_revisions,
        )
        .await;
        shared_usage.lock().await.accumulate(&usage);

        let Some(fixed_code) = fixed_code else {
            // Abort-on-any-subproblem-failure: one unrepaired lemma fails
            // the whole mediumweight attempt.
            return None;
        };
        if analysis.fix_lemma(lemma_name, &fixed_code).is_err() {
            return None;
        }
    }

    if cancel.is_cancelled() {
        return None;
    }

    let final_code = match analysis.construct_verification_code(target_name) {
        Ok(code) => code,
        Err(_) => return None,
    };
    let final_result = compilation
        .submit(CompileRequest {
            code: final_code.clone(),
            name: Some(target_name.to_string()),
            header: Some(header.to_string()),
        })
        .await
        .ok()?;
    if final_result.complete {
        Some(final_code)
    } else {
        None
    }
}

/// Runs `num_passes` independent mediumweight attempts concurrently,
/// returning the first to produce a fully compiling proof, the combined
/// token usage of every pass (including cancelled ones), and the union of
/// every fully-correct-lemma name discovered across all passes (again,
/// including ones from passes that ultimately lost the race — the
/// decomposition work they did is still useful to the caller).
#[allow(clippy::too_many_arguments)]
pub async fn mediumweight_inference(
    inference: &InferenceScheduler,
    compilation: &CompilationScheduler,
    model: &str,
    header: &str,
    target_name: &str,
    target_signature: &str,
    problem_index: usize,
    num_passes: usize,
    num_revisions: usize,
) -> (Option<String>, TokenUsage, Vec<String>) {
    let base_priority = problem_index as i64 * 16;
    let cancel = CancellationToken::new();
    let shared_usage = Arc::new(AsyncMutex::new(TokenUsage::default()));
    let shared_lemma_collection = Arc::new(AsyncMutex::new(Vec::new()));

    let mut passes = FuturesUnordered::new();
    for _ in 0..num_passes {
        let cancel = cancel.clone();
        let shared_usage = shared_usage.clone();
        let shared_lemma_collection = shared_lemma_collection.clone();
        passes.push(mediumweight_inference_single(
            inference,
            compilation,
            model,
            header,
            target_name,
            target_signature,
            num_revisions,
            base_priority,
            cancel,
            shared_usage,
            shared_lemma_collection,
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
    let lemma_collection = shared_lemma_collection.lock().await.clone();
    (winner, usage, lemma_collection)
}
