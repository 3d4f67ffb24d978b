//! Splits a Lean source file into its leading import/`set_option`/`open`
//! block and the declaration body that follows, and reassembles a canonical
//! header for generated files.
//!
//! Implements only the second of the two `split_import_and_body` functions
//! found in the original Python source: the later definition shadows the
//! first at module scope, so it is the one that ever actually runs. It
//! canonicalizes the import block to [`DEFAULT_IMPORTS`] whenever every
//! import line found in the source is already a member of that default
//! set; `open`/`set_option` lines are carried over verbatim only when the
//! source actually has them, never invented.

pub const DEFAULT_IMPORTS: &[&str] = &["import Mathlib", "import Aesop"];
pub const DEFAULT_OPEN: &str = "open BigOperators Real Nat Topology Rat";

/// Splits `source` into `(header, body)`. `header` never ends with a
/// trailing blank line; `body` starts at the first non-import/non-`open`/
/// non-`set_option` line.
pub fn split_import_and_body(source: &str) -> (String, String) {
    let lines: Vec<&str> = source.lines().collect();
    let mut found_imports = Vec::new();
    let mut set_option_lines = Vec::new();
    let mut open_line: Option<String> = None;
    let mut idx = 0;

    while idx < lines.len() {
        let trimmed = lines[idx].trim();
        if let Some(rest) = trimmed.strip_prefix("import ") {
            found_imports.push(format!("import {}", rest.trim()));
            idx += 1;
        } else if trimmed.starts_with("set_option") {
            set_option_lines.push(trimmed.to_string());
            idx += 1;
        } else if trimmed.starts_with("open ") && open_line.is_none() {
            open_line = Some(trimmed.to_string());
            idx += 1;
        } else if trimmed.is_empty() {
            idx += 1;
        } else {
            break;
        }
    }

    let canonical = found_imports.iter().all(|l| DEFAULT_IMPORTS.contains(&l.as_str()));
    let import_lines: Vec<String> = if canonical {
        DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect()
    } else if found_imports.is_empty() {
        DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect()
    } else {
        found_imports
    };

    let mut header = import_lines.join("\n");
    if !set_option_lines.is_empty() {
        header.push_str("\n\n");
        header.push_str(&set_option_lines.join("\n"));
    }
    if let Some(open) = open_line {
        header.push_str("\n\n");
        header.push_str(&open);
    }

    let body = lines[idx..].join("\n");
    (header, body)
}

/// Assembles a canonical header for generated verification/subproblem
/// files, optionally preserving a specific `open` line carried over from
/// the original source rather than always defaulting to [`DEFAULT_OPEN`].
pub fn assemble_header(preserved_open: Option<&str>) -> String {
    let mut header = DEFAULT_IMPORTS.join("\n");
    header.push_str("\n\n");
    header.push_str(preserved_open.unwrap_or(DEFAULT_OPEN));
    header.push_str("\n\n");
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_subset_of_default_imports() {
        let src = "import Mathlib\n\ntheorem foo : True := trivial\n";
        let (header, body) = split_import_and_body(src);
        assert_eq!(header, DEFAULT_IMPORTS.join("\n"));
        assert!(body.starts_with("theorem foo"));
    }

    #[test]
    fn preserves_an_existing_open_line() {
        let src = "import Mathlib\nimport Aesop\n\nopen Nat\n\ntheorem foo : True := trivial\n";
        let (header, body) = split_import_and_body(src);
        assert_eq!(header, format!("{}\n\nopen Nat", DEFAULT_IMPORTS.join("\n")));
        assert!(body.starts_with("theorem foo"));
    }

    #[test]
    fn preserves_non_default_imports() {
        let src = "import Mathlib.Data.Nat.Basic\nimport MyLib.Extra\n\ndef x := 1\n";
        let (header, body) = split_import_and_body(src);
        assert!(header.contains("import MyLib.Extra"));
        assert!(body.starts_with("def x"));
    }
}
