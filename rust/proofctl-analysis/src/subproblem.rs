use serde::{Deserialize, Serialize};

use crate::declaration::Declaration;

/// A single-lemma verification problem synthesized out of a larger proof:
/// its transitive `def` dependencies are inlined verbatim, its transitive
/// lemma/axiom dependencies are restated as `axiom`s (the `facts` list),
/// and the target itself is restated as a `theorem ... := by sorry` for an
/// LLM to fill in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subproblem {
    pub target: String,
    pub code: String,
    pub facts: Vec<String>,
}

/// Rewrites a declaration's signature into a bare fact: `theorem`/`lemma`
/// become `axiom`, the proof body is dropped.
pub fn as_fact(decl: &Declaration) -> String {
    let without_body = strip_trailing_assign(&decl.signature);
    let (_, rest) = split_first_word(without_body);
    format!("axiom {}", rest)
}

/// Rewrites a declaration's signature into a `sorry`-bodied theorem so an
/// LLM can attempt it from scratch.
pub fn as_sorry_theorem(decl: &Declaration) -> String {
    let without_body = strip_trailing_assign(&decl.signature);
    let (_, rest) = split_first_word(without_body);
    format!("theorem {} := by sorry", rest)
}

fn strip_trailing_assign(signature: &str) -> &str {
    signature.trim_end().strip_suffix(":=").unwrap_or(signature).trim_end()
}

fn split_first_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (s, ""),
    }
}
