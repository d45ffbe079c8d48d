//! Tree-sitter front end: language detection, parsing, symbol extraction,
//! and import/export scanning.

pub mod imports;
pub mod language;
pub mod parser;
pub mod symbols;

pub use imports::{ExportItem, ImportBinding, ImportKind, scan_exports, scan_imports};
pub use language::{Language, RESOLUTION_EXTENSIONS};
pub use parser::{MAX_AST_DEPTH, SourceParser, check_recursion_depth, node_text};
pub use symbols::{ExtractedFile, SymbolExtractor, leading_doc_comment};
