//! Path and hash utilities.
//!
//! Everything here is pure and deterministic: canonical path normalization,
//! content-addressed hashing, the top-level dependency scan, and syntactic
//! complexity counting. Nothing in this module touches the type checker.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use tree_sitter::Node;

/// Normalize a path to forward slashes, collapsing repeated separators and
/// stripping any trailing separator. Relativity to the repository root is
/// preserved.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_sep = false;
    for ch in path.chars() {
        let is_sep = ch == '/' || ch == '\\';
        if is_sep {
            if !last_was_sep {
                out.push('/');
            }
        } else {
            out.push(ch);
        }
        last_was_sep = is_sep;
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Resolve `.` and `..` segments without touching the file system.
/// Leading `..` segments that escape the root are kept as-is.
pub fn collapse_dots(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let normalized = normalize_path(path);
    for seg in normalized.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(&s) if s != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Parent directory of a normalized relative path, or `"."` at the root.
pub fn parent_dir(rel_path: &str) -> String {
    match rel_path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent.to_string(),
        _ => ".".to_string(),
    }
}

/// SHA-256 of the content, lowercase hex.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First 8 hex chars of the content hash. Used only to disambiguate symbol
/// ids; collisions are acceptable because the full signature is stored.
pub fn short_hash(content: &str) -> String {
    hash_content(content)[..8].to_string()
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)(?:import\s+(?:[\w$*{},\s]+\s+from\s+)?|export\s+(?:[\w$*{},\s]+\s+from\s+)?|require\s*\(\s*)["']([^"']+)["']"#)
            .expect("import regex is valid")
    })
}

/// Regex-level scan for `import … from "X"` / `require("X")` specifiers,
/// reduced to the set of bare package roots. Relative and absolute paths
/// are skipped; scoped packages keep their first two segments.
pub fn extract_top_level_dependencies(text: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    for cap in import_regex().captures_iter(text) {
        let spec = &cap[1];
        if spec.starts_with('.') || spec.starts_with('/') {
            continue;
        }
        let root = if let Some(rest) = spec.strip_prefix('@') {
            let mut parts = rest.splitn(3, '/');
            match (parts.next(), parts.next()) {
                (Some(scope), Some(name)) => format!("@{scope}/{name}"),
                _ => spec.to_string(),
            }
        } else {
            spec.split('/').next().unwrap_or(spec).to_string()
        };
        if !deps.contains(&root) {
            deps.push(root);
        }
    }
    deps
}

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "ternary_expression",
    "conditional_expression",
    "catch_clause",
];

/// Cyclomatic complexity: 1 + the number of branching constructs in the
/// subtree. Purely syntactic.
pub fn complexity(node: &Node) -> u32 {
    let mut count = 1;
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            if BRANCH_KINDS.contains(&child.kind()) {
                count += 1;
            }
            stack.push(child);
        }
    }
    count
}
