//! Prompt assembly. Wording is deliberately generic — only the structural
//! choice of template matters to the control plane, not its exact text.

/// Used when a subproblem has no `facts`: the model only ever sees the
/// goal, never an (always-empty) facts section. Kept as a separate
/// constant from [`INFERENCE_AXIOMS_TEMPLATE`] rather than unifying them
/// behind one parameterized template with an optional facts block, since
/// that's what the system this is modeled on does — the empty-facts case
/// and the has-facts case render through genuinely different templates,
/// not the same template with an empty list.
const INFERENCE_NOAXIOMS_TEMPLATE: &str = "Prove the following Lean 4 theorem.\n\nGoal:\n```lean4\n{goal}\n```\n";

const INFERENCE_AXIOMS_TEMPLATE: &str =
    "Prove the following Lean 4 theorem. You may use the given facts as axioms.\n\nFacts:\n```lean4\n{facts}\n```\n\nGoal:\n```lean4\n{goal}\n```\n";

const REVISION_TEMPLATE: &str = "Your previous attempt failed to compile. Fix the proof.\n\nGoal:\n```lean4\n{goal}\n```\n\nPrevious attempt:\n```lean4\n{previous}\n```\n\nCompiler errors:\n{errors}\n";

pub fn build_initial_prompt(goal: &str, facts: &[String]) -> String {
    if facts.is_empty() {
        INFERENCE_NOAXIOMS_TEMPLATE.replace("{goal}", goal)
    } else {
        INFERENCE_AXIOMS_TEMPLATE
            .replace("{facts}", &facts.join("\n\n"))
            .replace("{goal}", goal)
    }
}

pub fn build_revision_prompt(goal: &str, previous_attempt: &str, errors: &str) -> String {
    REVISION_TEMPLATE
        .replace("{goal}", goal)
        .replace("{previous}", previous_attempt)
        .replace("{errors}", errors)
}

/// Human-readable rendering of a `CompilationResult`'s errors, suitable
/// for embedding in a revision prompt.
pub fn format_errors(errors: &[proofctl_core::ErrorMessage]) -> String {
    if errors.is_empty() {
        return "(no specific error messages)".to_string();
    }
    errors
        .iter()
        .map(|e| format!("line {}, column {}: {}", e.pos.line, e.pos.column, e.data))
        .collect::<Vec<_>>()
        .join("\n")
}
