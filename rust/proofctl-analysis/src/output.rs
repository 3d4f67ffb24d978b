//! LLM output normalization: extracting a Lean proof out of a raw model
//! response, stripping comments, and guarding the final goal against
//! tampering. Kept behind a small trait so the extraction rules are a
//! pluggable policy rather than baked into the search strategies.

use regex::Regex;

/// Result of running an [`OutputPolicy`] over a raw LLM response.
#[derive(Debug, Clone)]
pub struct ExtractedProof {
    /// The assembled declaration, ready to splice into a verification file.
    pub code: String,
    /// Set when the raw output was rejected as adversarial (tried to dodge
    /// the goal with `apply?`/`exact?`/`admit`/a fresh `axiom`) — `code` is
    /// then just the original statement, unchanged.
    pub rejected: bool,
    pub rejection_reason: Option<&'static str>,
}

pub trait OutputPolicy: Send + Sync {
    /// `raw_output` is the full LLM response (possibly containing prose and
    /// fenced code blocks); `target_signature` is the canonical
    /// `theorem foo ... :=` the model was asked to prove, trailing `:=`
    /// included.
    fn extract_proof(&self, raw_output: &str, target_signature: &str) -> ExtractedProof;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOutputPolicy;

impl OutputPolicy for DefaultOutputPolicy {
    fn extract_proof(&self, raw_output: &str, target_signature: &str) -> ExtractedProof {
        let fenced = extract_fenced_block(raw_output);
        let cleaned = remove_lean_comments(&fenced);

        if let Some(reason) = find_adversarial_token(&cleaned) {
            return ExtractedProof {
                code: target_signature.trim_end().to_string(),
                rejected: true,
                rejection_reason: Some(reason),
            };
        }

        ExtractedProof {
            code: substitute_final_theorem(target_signature, &cleaned),
            rejected: false,
            rejection_reason: None,
        }
    }
}

/// Pulls the contents of the *last* fenced code block, preferring a
/// ` ```lean4 ` tag, then ` ```lean `, then any fenced block, falling back
/// to the whole trimmed input if no fence is present at all. A model that
/// restates the goal in prose before finally emitting its proof attempt
/// puts the real answer in the last fence, not the first.
pub fn extract_fenced_block(text: &str) -> String {
    for tag in ["lean4", "lean"] {
        let pattern = format!(r"```{tag}\s*\n([\s\S]*?)```");
        if let Some(block) = Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures_iter(text).last())
        {
            return block[1].trim().to_string();
        }
    }
    if let Some(block) = Regex::new(r"```[^\n]*\n([\s\S]*?)```")
        .ok()
        .and_then(|re| re.captures_iter(text).last())
    {
        return block[1].trim().to_string();
    }
    text.trim().to_string()
}

/// Strips Lean line comments (`--` to end of line) and nested block
/// comments (`/- ... /- ... -/ ... -/`). Hand-written as a depth-tracked
/// scanner rather than a regex because nesting isn't regular.
pub fn remove_lean_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut depth: u32 = 0;

    while i < chars.len() {
        if depth > 0 {
            if chars[i] == '/' && chars.get(i + 1) == Some(&'-') {
                depth += 1;
                i += 2;
            } else if chars[i] == '-' && chars.get(i + 1) == Some(&'/') {
                depth -= 1;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if chars[i] == '/' && chars.get(i + 1) == Some(&'-') {
            depth = 1;
            i += 2;
            continue;
        }
        if chars[i] == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn find_adversarial_token(text: &str) -> Option<&'static str> {
    if text.contains("apply?") {
        return Some("apply?");
    }
    if text.contains("exact?") {
        return Some("exact?");
    }
    static ADMIT: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    static NEW_AXIOM: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let admit = ADMIT.get_or_init(|| Regex::new(r"\badmit\b").unwrap());
    let new_axiom = NEW_AXIOM.get_or_init(|| Regex::new(r"(?m)^\s*axiom\s").unwrap());
    if admit.is_match(text) {
        return Some("admit");
    }
    if new_axiom.is_match(text) {
        return Some("axiom");
    }
    None
}

/// Anchors on the *last* `theorem` declaration in `proof_source` and
/// replaces only that final theorem's signature with `target_signature`,
/// keeping everything before it (`proof_prefix` — helper lemmas the model
/// introduced along the way) and everything after its own `:=` (the tactic
/// proof itself) untouched. A model cannot rename or restate the goal, but
/// any scaffolding lemmas it built to get there survive the substitution.
pub fn substitute_final_theorem(target_signature: &str, proof_source: &str) -> String {
    let proof = proof_source.trim();
    let signature = target_signature.trim();

    let last_theorem_index = proof.rfind("\ntheorem ").map(|i| i + 1).or_else(|| {
        if proof.starts_with("theorem ") {
            Some(0)
        } else {
            None
        }
    });

    let Some(start) = last_theorem_index else {
        return format!("{proof}\n\n{signature}");
    };

    let proof_prefix = proof[..start].trim();
    let final_theorem_block = &proof[start..];

    let Some(proof_start) = final_theorem_block.find(":=") else {
        return format!("{proof_prefix}\n\n{signature}");
    };
    let original_proof_part = final_theorem_block[proof_start..].trim();

    let signature_theorem_start = signature.rfind("\ntheorem ").map(|i| i + 1).or_else(|| {
        if signature.starts_with("theorem ") {
            Some(0)
        } else {
            None
        }
    });
    let Some(sig_start) = signature_theorem_start else {
        return format!("{proof_prefix}\n\n{signature}");
    };

    let Some(sig_end) = signature.rfind(":=") else {
        return format!("{proof_prefix}\n\n{signature}");
    };
    let new_signature_part = signature[sig_start..sig_end].trim();

    if proof_prefix.is_empty() {
        format!("{new_signature_part} {original_proof_part}")
    } else {
        format!("{proof_prefix}\n\n{new_signature_part} {original_proof_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_lean4_fence_over_lean_fence() {
        let raw = "some prose\n```lean\nwrong\n```\n```lean4\nright\n```\n";
        assert_eq!(extract_fenced_block(raw), "right");
    }

    #[test]
    fn strips_nested_block_comments() {
        let src = "theorem foo := by /- outer /- inner -/ still outer -/ rfl";
        assert_eq!(remove_lean_comments(src), "theorem foo := by  rfl");
    }

    #[test]
    fn strips_line_comments() {
        let src = "theorem foo := by rfl -- done\nmore";
        assert_eq!(remove_lean_comments(src), "theorem foo := by rfl \nmore");
    }

    #[test]
    fn rejects_admit_and_keeps_original_statement() {
        let policy = DefaultOutputPolicy;
        let out = policy.extract_proof("```lean4\ntheorem foo := by admit\n```", "theorem foo : True :=");
        assert!(out.rejected);
        assert_eq!(out.code, "theorem foo : True :=");
    }

    #[test]
    fn accepts_clean_proof_and_substitutes_signature() {
        let policy = DefaultOutputPolicy;
        let out = policy.extract_proof("```lean4\ntheorem bar : True := by trivial\n```", "theorem foo : True :=");
        assert!(!out.rejected);
        assert_eq!(out.code, "theorem foo : True := by trivial");
    }

    #[test]
    fn prefers_the_last_fenced_block_over_the_first() {
        let raw = "```lean4\ntheorem bar : True := sorry\n```\nlet me retry\n```lean4\ntheorem bar : True := by trivial\n```\n";
        assert_eq!(extract_fenced_block(raw), "theorem bar : True := by trivial");
    }

    #[test]
    fn substitute_final_theorem_preserves_helper_lemmas() {
        let proof_source = "lemma helper : True := trivial\n\ntheorem bar : True := by exact helper";
        let result = substitute_final_theorem("theorem foo : True :=", proof_source);
        assert_eq!(
            result,
            "lemma helper : True := trivial\n\ntheorem foo : True := by exact helper"
        );
    }

    #[test]
    fn substitute_final_theorem_with_no_theorem_keyword_appends_signature() {
        let result = substitute_final_theorem("theorem foo : True :=", "def helper := 1");
        assert_eq!(result, "def helper := 1\n\ntheorem foo : True :=");
    }
}
