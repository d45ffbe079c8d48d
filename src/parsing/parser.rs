//! Tree-sitter front end.
//!
//! Wraps the TypeScript/TSX/JavaScript grammars behind one parser type and
//! surfaces syntax problems as diagnostics instead of failures: a tree with
//! ERROR nodes still yields entities and whatever edges can be extracted.

use crate::error::{ExtractError, ExtractResult};
use crate::parsing::Language;
use crate::types::{Diagnostic, Severity};
use tree_sitter::{Node, Parser, Tree};

/// Maximum recursion depth for AST traversal, protecting against deeply
/// nested structures overflowing the stack.
pub const MAX_AST_DEPTH: usize = 500;

/// Check whether recursion may continue at this depth. Callers stop
/// descending when this returns false.
#[inline]
pub fn check_recursion_depth(depth: usize, node: Node) -> bool {
    if depth > MAX_AST_DEPTH {
        tracing::warn!(
            "max AST depth ({}) exceeded at {}:{}, skipping subtree",
            MAX_AST_DEPTH,
            node.start_position().row + 1,
            node.start_position().column + 1
        );
        return false;
    }
    true
}

/// Parser for the TypeScript language family.
pub struct SourceParser {
    parser: Parser,
    language: Language,
}

impl SourceParser {
    pub fn new(language: Language) -> ExtractResult<Self> {
        let grammar: tree_sitter::Language = match language {
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::JavaScript | Language::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            other => {
                return Err(ExtractError::GrammarInit {
                    language: other.as_str().to_string(),
                    reason: "no grammar for this language".to_string(),
                });
            }
        };
        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|e| ExtractError::GrammarInit {
                language: language.as_str().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { parser, language })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse source text. Returns the tree plus syntax diagnostics for any
    /// ERROR/MISSING nodes found.
    pub fn parse(&mut self, code: &str, rel_path: &str) -> ExtractResult<(Tree, Vec<Diagnostic>)> {
        let tree = self
            .parser
            .parse(code, None)
            .ok_or_else(|| ExtractError::Parse {
                path: rel_path.into(),
                language: self.language.as_str().to_string(),
                reason: "parser produced no tree".to_string(),
            })?;
        let diagnostics = collect_syntax_diagnostics(&tree, rel_path);
        Ok((tree, diagnostics))
    }
}

/// Walk the tree for ERROR and MISSING nodes, reporting the first few as
/// warning diagnostics. The cap keeps a badly mangled file from flooding
/// the error stream.
fn collect_syntax_diagnostics(tree: &Tree, rel_path: &str) -> Vec<Diagnostic> {
    const MAX_REPORTED: usize = 5;
    let mut diagnostics = Vec::new();
    if !tree.root_node().has_error() {
        return diagnostics;
    }
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if diagnostics.len() >= MAX_REPORTED {
            break;
        }
        if node.is_error() || node.is_missing() {
            let what = if node.is_missing() {
                "missing syntax"
            } else {
                "syntax error"
            };
            diagnostics.push(
                Diagnostic {
                    file: rel_path.to_string(),
                    line: node.start_position().row as u32,
                    column: node.start_position().column as u32,
                    message: what.to_string(),
                    severity: Severity::Warning,
                },
            );
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            // Depth-first in source order
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
    }
    diagnostics
}

/// Node text helper; returns an empty string for out-of-range nodes rather
/// than panicking on malformed byte ranges.
#[inline]
pub fn node_text<'a>(node: &Node, code: &'a str) -> &'a str {
    code.get(node.byte_range()).unwrap_or("")
}
