use std::collections::{HashMap, HashSet};

use crate::declaration::{Declaration, DeclarationKind};

/// Computes the set of lemma/theorem names that are "fully correct": the
/// declaration itself verified `pass`, and every lemma/theorem it
/// (transitively) depends on is also fully correct. `def`s and `axiom`s
/// never block a lemma from being fully correct.
///
/// Declarations participating in a dependency cycle are treated as *not*
/// fully correct rather than causing infinite recursion — the Python
/// original only partially guards against this; this is the defensive
/// strengthening called for by the corresponding design note.
pub fn fully_correct_lemmas(
    declarations: &HashMap<String, Declaration>,
    verified: &HashMap<String, bool>,
) -> HashSet<String> {
    let mut memo: HashMap<String, bool> = HashMap::new();
    let mut result = HashSet::new();
    for name in declarations.keys() {
        if is_fully_correct(name, declarations, verified, &mut memo, &mut HashSet::new()) {
            result.insert(name.clone());
        }
    }
    result
}

fn is_fully_correct(
    name: &str,
    declarations: &HashMap<String, Declaration>,
    verified: &HashMap<String, bool>,
    memo: &mut HashMap<String, bool>,
    visiting: &mut HashSet<String>,
) -> bool {
    if let Some(&cached) = memo.get(name) {
        return cached;
    }
    if visiting.contains(name) {
        // Cycle: neither side of the cycle can be proven fully correct
        // from the other, so it is conservatively false.
        return false;
    }
    let Some(decl) = declarations.get(name) else {
        return false;
    };
    if !decl.kind.is_provable() {
        // defs and axioms are not themselves verified; they only gate
        // their dependents via the dependents' own verification status.
        let result = true;
        memo.insert(name.to_string(), result);
        return result;
    }

    visiting.insert(name.to_string());
    let self_ok = verified.get(name).copied().unwrap_or(false);
    let deps_ok = decl
        .dependencies
        .iter()
        .all(|dep| is_fully_correct(dep, declarations, verified, memo, visiting));
    visiting.remove(name);

    let result = self_ok && deps_ok;
    memo.insert(name.to_string(), result);
    result
}

/// Topological order (dependencies before dependents) of `names` plus
/// their transitive dependencies restricted to `kind`, for inlining defs
/// in a safe order. Cycles break ties by first-seen order rather than
/// panicking.
pub fn topo_order_of_kind(
    roots: &[String],
    declarations: &HashMap<String, Declaration>,
    kind: DeclarationKind,
) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    for root in roots {
        visit(root, declarations, kind, &mut visited, &mut order);
    }
    order
}

fn visit(
    name: &str,
    declarations: &HashMap<String, Declaration>,
    kind: DeclarationKind,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    if visited.contains(name) {
        return;
    }
    visited.insert(name.to_string());
    let Some(decl) = declarations.get(name) else {
        return;
    };
    for dep in &decl.dependencies {
        if declarations.get(dep).map(|d| d.kind) == Some(kind) {
            visit(dep, declarations, kind, visited, order);
        }
    }
    if decl.kind == kind {
        order.push(name.to_string());
    }
}

/// All declarations transitively reachable from `root`'s direct
/// dependencies, excluding `root` itself, in dependency-before-dependent
/// order. Safe against cycles (a visited guard, not recursion-depth
/// tracking, since this walk need not detect correctness cycles the way
/// [`is_fully_correct`] does).
pub fn transitive_dependencies(root: &str, declarations: &HashMap<String, Declaration>) -> Vec<String> {
    let mut visited = HashSet::new();
    visited.insert(root.to_string());
    let mut order = Vec::new();
    if let Some(decl) = declarations.get(root) {
        for dep in &decl.dependencies {
            visit_all(dep, declarations, &mut visited, &mut order);
        }
    }
    order
}

fn visit_all(
    name: &str,
    declarations: &HashMap<String, Declaration>,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    if visited.contains(name) {
        return;
    }
    visited.insert(name.to_string());
    if let Some(decl) = declarations.get(name) {
        for dep in &decl.dependencies {
            visit_all(dep, declarations, visited, order);
        }
        order.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::parse_declarations;

    fn decls_map(src: &str) -> HashMap<String, Declaration> {
        parse_declarations(src)
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect()
    }

    #[test]
    fn lemma_depending_on_unverified_lemma_is_not_fully_correct() {
        let src = "lemma a : True := trivial\nlemma b : True := a\n";
        let declarations = decls_map(src);
        let mut verified = HashMap::new();
        verified.insert("a".to_string(), false);
        verified.insert("b".to_string(), true);
        let correct = fully_correct_lemmas(&declarations, &verified);
        assert!(!correct.contains("b"));
        assert!(!correct.contains("a"));
    }

    #[test]
    fn cyclic_lemmas_are_never_fully_correct() {
        let src = "lemma a : True := b\nlemma b : True := a\n";
        let declarations = decls_map(src);
        let mut verified = HashMap::new();
        verified.insert("a".to_string(), true);
        verified.insert("b".to_string(), true);
        let correct = fully_correct_lemmas(&declarations, &verified);
        assert!(correct.is_empty());
    }

    #[test]
    fn fully_correct_chain_propagates() {
        let src = "lemma a : True := trivial\nlemma b : True := a\n";
        let declarations = decls_map(src);
        let mut verified = HashMap::new();
        verified.insert("a".to_string(), true);
        verified.insert("b".to_string(), true);
        let correct = fully_correct_lemmas(&declarations, &verified);
        assert!(correct.contains("a"));
        assert!(correct.contains("b"));
    }
}
