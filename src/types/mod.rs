//! Core value types shared across the extractor.

use serde::{Deserialize, Serialize};

/// Source location span, zero-based lines and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u16,
    pub end_line: u32,
    pub end_column: u16,
}

impl Range {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Build a range from a tree-sitter node's positions.
    pub fn from_node(node: &tree_sitter::Node) -> Self {
        Self {
            start_line: node.start_position().row as u32,
            start_column: node.start_position().column as u16,
            end_line: node.end_position().row as u32,
            end_column: node.end_position().column as u16,
        }
    }

    pub fn contains(&self, line: u32, column: u16) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }

    /// Whether `other` lies entirely inside this range.
    pub fn encloses(&self, other: &Range) -> bool {
        self.contains(other.start_line, other.start_column)
            && self.contains(other.end_line, other.end_column)
    }

    /// Strictly-before ordering by (line, column) of the start position.
    pub fn starts_before(&self, other: &Range) -> bool {
        (self.start_line, self.start_column) < (other.start_line, other.start_column)
    }
}

/// Member visibility. TypeScript members default to public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
}

/// Kind tag for symbol entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    TypeAlias,
    Property,
    Variable,
    /// Catch-all for named declarations without a dedicated tag (enums, namespaces).
    Symbol,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::TypeAlias => "typeAlias",
            Self::Property => "property",
            Self::Variable => "variable",
            Self::Symbol => "symbol",
        }
    }
}

/// Per-file diagnostic surfaced through `ParseOutcome.errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: 0,
            column: 0,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: 0,
            column: 0,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains() {
        let range = Range::new(10, 5, 15, 20);

        assert!(range.contains(12, 10));
        assert!(range.contains(10, 5));
        assert!(range.contains(15, 20));

        assert!(!range.contains(9, 10));
        assert!(!range.contains(16, 10));
        assert!(!range.contains(10, 4));
        assert!(!range.contains(15, 21));
    }

    #[test]
    fn test_range_encloses() {
        let outer = Range::new(0, 0, 20, 0);
        let inner = Range::new(5, 2, 6, 10);
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
    }

    #[test]
    fn test_starts_before() {
        let a = Range::new(1, 4, 1, 9);
        let b = Range::new(1, 6, 1, 12);
        assert!(a.starts_before(&b));
        assert!(!b.starts_before(&a));
    }

    #[test]
    fn test_visibility_default_is_public() {
        assert_eq!(Visibility::default(), Visibility::Public);
    }

    #[test]
    fn test_symbol_kind_tags() {
        assert_eq!(SymbolKind::TypeAlias.as_str(), "typeAlias");
        assert_eq!(
            serde_json::to_string(&SymbolKind::TypeAlias).unwrap(),
            "\"typeAlias\""
        );
    }
}
