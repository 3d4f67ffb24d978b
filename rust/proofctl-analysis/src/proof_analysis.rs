use std::collections::HashMap;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use proofctl_core::CompilationResult;
use serde::Serialize;

use crate::declaration::{parse_declarations, Declaration, DeclarationKind};
use crate::error::AnalysisError;
use crate::graph::{fully_correct_lemmas, topo_order_of_kind, transitive_dependencies};
use crate::header::{assemble_header, split_import_and_body, DEFAULT_OPEN};
use crate::subproblem::{as_fact, as_sorry_theorem, Subproblem};

/// Injected compilation backend used to verify individual declarations in
/// isolation. A thin async seam (mirroring `lumen-compiler`'s
/// `SmtSolver` trait over an external process) so `ProofAnalysis` can be
/// unit-tested against a fake without talking to a real compilation
/// gateway.
pub trait LeanVerifier: Send + Sync {
    fn verify<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<CompilationResult, AnalysisError>>;
}

/// A fully parsed Lean source file: its header, its declarations in
/// source order, and the verification status accumulated so far.
pub struct ProofAnalysis {
    pub header: String,
    pub preserved_open: Option<String>,
    order: Vec<String>,
    declarations: HashMap<String, Declaration>,
    verified: HashMap<String, bool>,
}

impl ProofAnalysis {
    pub fn from_source(source: &str) -> Self {
        let (header, body) = split_import_and_body(source);
        let preserved_open = header
            .lines()
            .find(|l| l.trim_start().starts_with("open "))
            .filter(|l| l.trim() != DEFAULT_OPEN)
            .map(|l| l.trim().to_string());
        let declarations = parse_declarations(&body);
        let order = declarations.iter().map(|d| d.name.clone()).collect();
        let declarations = declarations.into_iter().map(|d| (d.name.clone(), d)).collect();
        ProofAnalysis {
            header,
            preserved_open,
            order,
            declarations,
            verified: HashMap::new(),
        }
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn declarations_in_order(&self) -> impl Iterator<Item = &Declaration> {
        self.order.iter().filter_map(|name| self.declarations.get(name))
    }

    pub fn is_verified(&self, name: &str) -> Option<bool> {
        self.verified.get(name).copied()
    }

    /// Builds a standalone verification file for `name`: its own original
    /// proof, with every dependency inlined (`def`s verbatim, lemma/axiom
    /// dependencies turned into `axiom` facts so the original proof body
    /// doesn't need to change).
    pub fn construct_verification_code(&self, name: &str) -> Result<String, AnalysisError> {
        let decl = self
            .declarations
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownDeclaration(name.to_string()))?;
        let deps = transitive_dependencies(name, &self.declarations);
        let defs = topo_order_of_kind(&[name.to_string()], &self.declarations, DeclarationKind::Def);

        let mut code = assemble_header(self.preserved_open.as_deref());
        for def_name in &defs {
            if let Some(d) = self.declarations.get(def_name) {
                code.push_str(&d.full_text);
                code.push_str("\n\n");
            }
        }
        for dep_name in &deps {
            if dep_name == name {
                continue;
            }
            if let Some(d) = self.declarations.get(dep_name) {
                if d.kind != DeclarationKind::Def {
                    code.push_str(&as_fact(d));
                    code.push_str("\n\n");
                }
            }
        }
        code.push_str(&decl.full_text);
        code.push('\n');
        Ok(code)
    }

    /// Verifies every lemma/theorem declaration with a proof body,
    /// concurrently, storing each one's completion status in
    /// `self.verified`. A declaration `is_verified` iff its verification
    /// file compiled `complete` (no errors and no residual `sorry`) —
    /// merely `pass`ing is not enough, since a `sorry`-riddled proof still
    /// passes but never finished.
    pub async fn verify_all_lemmas(&mut self, verifier: &dyn LeanVerifier) -> Result<(), AnalysisError> {
        let targets: Vec<String> = self
            .order
            .iter()
            .filter(|n| self.declarations[*n].has_proof())
            .cloned()
            .collect();

        let codes: Result<Vec<(String, String)>, AnalysisError> = targets
            .into_iter()
            .map(|name| self.construct_verification_code(&name).map(|code| (name, code)))
            .collect();
        let codes = codes?;

        let mut pending = FuturesUnordered::new();
        for (name, code) in codes {
            pending.push(async move {
                let result = verifier.verify(&code).await;
                (name, result)
            });
        }
        // Mirrors `asyncio.gather(..., return_exceptions=True)`: one
        // verifier failure doesn't abort the batch, it just leaves that
        // declaration unverified.
        while let Some((name, result)) = pending.next().await {
            let complete = result.map(|r| r.complete).unwrap_or(false);
            self.verified.insert(name, complete);
        }
        Ok(())
    }

    /// Names of lemmas/theorems whose own proof and every transitive
    /// lemma/theorem dependency verified successfully. See
    /// [`crate::graph::fully_correct_lemmas`] for the cycle-safety
    /// contract.
    pub fn fully_correct_lemmas(&self) -> std::collections::HashSet<String> {
        fully_correct_lemmas(&self.declarations, &self.verified)
    }

    /// Synthesizes a single-lemma subproblem for `name`: transitive `def`
    /// dependencies inlined verbatim, transitive lemma/axiom dependencies
    /// restated as `axiom` facts, and `name` itself restated as
    /// `theorem ... := by sorry`.
    pub fn construct_subproblem(&self, name: &str) -> Result<Subproblem, AnalysisError> {
        let decl = self
            .declarations
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownDeclaration(name.to_string()))?;
        let deps = transitive_dependencies(name, &self.declarations);
        let defs = topo_order_of_kind(&[name.to_string()], &self.declarations, DeclarationKind::Def);

        let mut code = assemble_header(self.preserved_open.as_deref());
        for def_name in &defs {
            if let Some(d) = self.declarations.get(def_name) {
                code.push_str(&d.full_text);
                code.push_str("\n\n");
            }
        }
        let mut facts = Vec::new();
        for dep_name in &deps {
            if let Some(d) = self.declarations.get(dep_name) {
                if d.kind != DeclarationKind::Def {
                    code.push_str(&as_fact(d));
                    code.push_str("\n\n");
                    facts.push(dep_name.clone());
                }
            }
        }
        code.push_str(&as_sorry_theorem(decl));
        code.push('\n');

        Ok(Subproblem {
            target: name.to_string(),
            code,
            facts,
        })
    }

    /// Splices a repaired declaration (and any fresh helper lemmas it
    /// brought with it) in place of the existing declaration `name`.
    ///
    /// Any declaration in `replacement_source` whose name collides with an
    /// existing declaration other than `name` itself is renamed to
    /// `<name>_base_<k>` (first unused `k`), and whole-word references to
    /// the old name inside the replacement set are rewritten to match.
    /// Declarations untouched by the fix keep their prior verification
    /// status; the renamed/replaced ones are marked unverified so they get
    /// re-checked.
    pub fn fix_lemma(&mut self, name: &str, replacement_source: &str) -> Result<Vec<String>, AnalysisError> {
        if !self.declarations.contains_key(name) {
            return Err(AnalysisError::UnknownDeclaration(name.to_string()));
        }
        let mut new_decls = parse_declarations(replacement_source);
        if !new_decls.iter().any(|d| d.name == name) {
            return Err(AnalysisError::MissingTargetInReplacement(name.to_string()));
        }

        let mut rename_map: HashMap<String, String> = HashMap::new();
        for d in &new_decls {
            if d.name == name {
                continue;
            }
            if self.declarations.contains_key(&d.name) {
                let mut k = 0usize;
                let mut candidate = format!("{}_base_{}", d.name, k);
                while self.declarations.contains_key(&candidate) || rename_map.values().any(|v| v == &candidate) {
                    k += 1;
                    candidate = format!("{}_base_{}", d.name, k);
                }
                rename_map.insert(d.name.clone(), candidate);
            }
        }

        for d in &mut new_decls {
            for (old, new) in &rename_map {
                d.full_text = rename_whole_word(&d.full_text, old, new);
                d.signature = rename_whole_word(&d.signature, old, new);
                if let Some(body) = &d.body {
                    d.body = Some(rename_whole_word(body, old, new));
                }
            }
            if let Some(renamed) = rename_map.get(&d.name) {
                d.name = renamed.clone();
            }
        }

        let candidate_names: std::collections::HashSet<String> =
            new_decls.iter().map(|d| d.name.clone()).collect();
        for d in &mut new_decls {
            d.dependencies = crate::declaration::whole_word_references(&d.full_text, &candidate_names, &d.name);
        }

        let insert_at = self.order.iter().position(|n| n == name).unwrap();
        let mut new_order = self.order.clone();
        new_order.remove(insert_at);
        let new_names: Vec<String> = new_decls.iter().map(|d| d.name.clone()).collect();
        for (offset, new_name) in new_names.iter().enumerate() {
            new_order.insert(insert_at + offset, new_name.clone());
        }

        self.verified.remove(name);
        for new_name in &new_names {
            self.declarations.remove(new_name);
            self.verified.remove(new_name);
        }
        self.declarations.remove(name);
        for d in new_decls {
            self.declarations.insert(d.name.clone(), d);
        }
        self.order = new_order;

        // Existing declarations that referenced the old helper names now
        // need their own dependency lists refreshed; signatures/bodies are
        // untouched since only the replaced subtree's names changed.
        let all_names: std::collections::HashSet<String> = self.declarations.keys().cloned().collect();
        for d in self.declarations.values_mut() {
            if !new_names.contains(&d.name) {
                d.dependencies = crate::declaration::whole_word_references(&d.full_text, &all_names, &d.name);
            }
        }

        Ok(new_names)
    }

    pub fn report(&self) -> ProofReport {
        ProofReport {
            declarations: self
                .declarations_in_order()
                .map(|d| DeclarationReport {
                    name: d.name.clone(),
                    kind: d.kind.to_string(),
                    dependencies: d.dependencies.clone(),
                    verified: self.verified.get(&d.name).copied(),
                })
                .collect(),
            fully_correct: {
                let mut names: Vec<String> = self.fully_correct_lemmas().into_iter().collect();
                names.sort();
                names
            },
        }
    }

    pub fn report_text(&self) -> String {
        let report = self.report();
        let mut out = String::new();
        for d in &report.declarations {
            let status = match d.verified {
                Some(true) => "pass",
                Some(false) => "fail",
                None => "unverified",
            };
            out.push_str(&format!("{} [{}] {} (deps: {})\n", d.name, d.kind, status, d.dependencies.join(", ")));
        }
        out.push_str(&format!("fully correct: {}\n", report.fully_correct.join(", ")));
        out
    }
}

#[derive(Debug, Serialize)]
pub struct DeclarationReport {
    pub name: String,
    pub kind: String,
    pub dependencies: Vec<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProofReport {
    pub declarations: Vec<DeclarationReport>,
    pub fully_correct: Vec<String>,
}

fn rename_whole_word(text: &str, old: &str, new: &str) -> String {
    let re = regex::Regex::new(&format!(r"\b{}\b", regex::escape(old))).unwrap();
    re.replace_all(text, new).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofctl_core::ErrorMessage;

    struct AlwaysPass;
    impl LeanVerifier for AlwaysPass {
        fn verify<'a>(&'a self, _code: &'a str) -> BoxFuture<'a, Result<CompilationResult, AnalysisError>> {
            Box::pin(async { Ok(CompilationResult::from_messages(Vec::new(), Vec::new())) })
        }
    }

    struct FailsOn(&'static str);
    impl LeanVerifier for FailsOn {
        fn verify<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<CompilationResult, AnalysisError>> {
            let fails = code.contains(&format!("theorem {}", self.0)) || code.contains(&format!("lemma {}", self.0));
            Box::pin(async move {
                if fails {
                    Ok(CompilationResult::from_messages(
                        vec![ErrorMessage {
                            severity: "error".into(),
                            pos: proofctl_core::Position { line: 1, column: 0 },
                            end_pos: None,
                            data: "nope".into(),
                        }],
                        Vec::new(),
                    ))
                } else {
                    Ok(CompilationResult::from_messages(Vec::new(), Vec::new()))
                }
            })
        }
    }

    #[tokio::test]
    async fn verifies_and_closes_fully_correct_set() {
        let src = "import Mathlib\n\nlemma a : True := trivial\n\ntheorem b : True := a\n";
        let mut analysis = ProofAnalysis::from_source(src);
        analysis.verify_all_lemmas(&AlwaysPass).await.unwrap();
        let correct = analysis.fully_correct_lemmas();
        assert!(correct.contains("a"));
        assert!(correct.contains("b"));
    }

    #[tokio::test]
    async fn failing_dependency_blocks_dependent() {
        let src = "import Mathlib\n\nlemma a : True := trivial\n\ntheorem b : True := a\n";
        let mut analysis = ProofAnalysis::from_source(src);
        analysis.verify_all_lemmas(&FailsOn("a")).await.unwrap();
        let correct = analysis.fully_correct_lemmas();
        assert!(!correct.contains("a"));
        assert!(!correct.contains("b"));
    }

    #[test]
    fn construct_subproblem_inlines_defs_and_lists_facts() {
        let src = "import Mathlib\n\ndef helper : Nat := 1\n\naxiom ax1 : True\n\ntheorem goal : helper = 1 := by trivial\n";
        let analysis = ProofAnalysis::from_source(src);
        let sub = analysis.construct_subproblem("goal").unwrap();
        assert!(sub.code.contains("def helper"));
        assert!(sub.code.contains("axiom ax1"));
        assert!(sub.code.contains("theorem goal"));
        assert!(sub.code.contains("by sorry"));
        assert_eq!(sub.facts, vec!["ax1".to_string()]);
    }

    #[test]
    fn fix_lemma_renames_colliding_helpers() {
        let src = "import Mathlib\n\nlemma helper : True := trivial\n\ntheorem goal : True := helper\n";
        let mut analysis = ProofAnalysis::from_source(src);
        let replacement = "lemma helper : True := by trivial\n\ntheorem goal : True := helper\n";
        let new_names = analysis.fix_lemma("goal", replacement).unwrap();
        assert!(new_names.iter().any(|n| n.starts_with("helper_base_")));
        assert!(analysis.declaration("goal").is_some());
    }
}
