use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A top-level Lean declaration kind. `Lemma` and `Theorem` are verified
/// and can appear as subproblem targets; `Def` is inlined verbatim wherever
/// it's used; `Axiom` is inlined as a fact, never re-verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Axiom,
    Lemma,
    Theorem,
    Def,
}

impl DeclarationKind {
    pub fn is_provable(self) -> bool {
        matches!(self, DeclarationKind::Lemma | DeclarationKind::Theorem)
    }
}

impl Declaration {
    /// `kind ∈ {lemma, theorem}` and the declaration actually has a proof
    /// body (`:=` occurred in its source). A bare forward declaration or a
    /// truncated parse has `body == None` and is never a verification
    /// target.
    pub fn has_proof(&self) -> bool {
        self.kind.is_provable() && self.body.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Everything up to and including the `:=` that introduces the proof
    /// or definition body (or the whole declaration, for a bodyless axiom).
    pub signature: String,
    /// The text after `:=`, if any.
    pub body: Option<String>,
    /// The declaration exactly as it appeared in the source.
    pub full_text: String,
    /// Other declarations in the same file referenced by whole-word match
    /// anywhere in `full_text`, excluding `name` itself.
    pub dependencies: Vec<String>,
}

fn decl_start_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(axiom|lemma|theorem|def)\s+([A-Za-z_][A-Za-z0-9_'.]*)").unwrap()
    })
}

/// Parses every top-level declaration out of `body` (the post-header part
/// of a source file). A declaration's span runs from its keyword to the
/// byte just before the next declaration's keyword, or to the end of the
/// string for the last one.
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    let re = decl_start_re();
    let starts: Vec<(usize, DeclarationKind, String)> = re
        .captures_iter(body)
        .map(|c| {
            let m = c.get(0).unwrap();
            let kind: DeclarationKind = c[1].parse().expect("regex only matches known keywords");
            (m.start(), kind, c[2].to_string())
        })
        .collect();

    let mut declarations = Vec::with_capacity(starts.len());
    for (i, (start, kind, name)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|(s, _, _)| *s).unwrap_or(body.len());
        let full_text = body[*start..end].trim_end().to_string();
        let (signature, decl_body) = match full_text.find(":=") {
            Some(pos) => (
                full_text[..pos + 2].to_string(),
                Some(full_text[pos + 2..].trim().to_string()),
            ),
            None => (full_text.clone(), None),
        };
        declarations.push(Declaration {
            name: name.clone(),
            kind: *kind,
            signature,
            body: decl_body,
            full_text,
            dependencies: Vec::new(),
        });
    }

    let names: HashSet<String> = declarations.iter().map(|d| d.name.clone()).collect();
    for decl in declarations.iter_mut() {
        decl.dependencies = whole_word_references(&decl.full_text, &names, &decl.name);
    }
    declarations
}

/// Whole-word occurrences of any name in `candidates` inside `text`,
/// excluding `self_name`, in first-occurrence order.
pub fn whole_word_references(text: &str, candidates: &HashSet<String>, self_name: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let word_re = word_boundary_re();
    for m in word_re.find_iter(text) {
        let word = m.as_str();
        if word == self_name {
            continue;
        }
        if candidates.contains(word) && seen.insert(word.to_string()) {
            out.push(word.to_string());
        }
    }
    out
}

fn word_boundary_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_'.]*").unwrap())
}

/// Dependencies referenced only within a declaration's proof body (after
/// `:=`), used when inlining *only* what the proof itself calls rather
/// than what the signature mentions.
pub fn proof_body_dependencies(decl: &Declaration, candidates: &HashSet<String>) -> Vec<String> {
    match &decl.body {
        Some(body) => whole_word_references(body, candidates, &decl.name),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_declarations_and_dependencies() {
        let src = "def helper (n : Nat) : Nat := n + 1\n\ntheorem uses_helper (n : Nat) : helper n = n + 1 := by rfl\n";
        let decls = parse_declarations(src);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "helper");
        assert_eq!(decls[0].kind, DeclarationKind::Def);
        assert_eq!(decls[1].name, "uses_helper");
        assert_eq!(decls[1].dependencies, vec!["helper".to_string()]);
    }

    #[test]
    fn axiom_without_body_has_no_body_text() {
        let src = "axiom foo : True\n";
        let decls = parse_declarations(src);
        assert_eq!(decls.len(), 1);
        assert!(decls[0].body.is_none());
    }
}
