//! Import and export statement scanning.
//!
//! Produces the per-file maps that feed module resolution and edge
//! extraction: which local aliases came from which modules, and which names
//! a module exposes (including re-exports, which the resolver follows
//! through its bounded-depth chain walk).

use crate::parsing::parser::node_text;
use crate::types::Range;
use tree_sitter::{Node, Tree};

/// Import statement shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    SideEffect,
    Default,
    Namespace,
    Named,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SideEffect => "side-effect",
            Self::Default => "default",
            Self::Namespace => "namespace",
            Self::Named => "named",
        }
    }
}

/// One binding introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Module specifier, verbatim (without quotes).
    pub module: String,
    /// Local alias bound in this file, `None` for side-effect imports.
    pub alias: Option<String>,
    /// Name in the exporting module (`"default"` for default imports,
    /// `None` for namespace/side-effect imports).
    pub imported: Option<String>,
    pub kind: ImportKind,
    pub is_type_only: bool,
    pub range: Range,
}

/// Scan every import statement in the file.
pub fn scan_imports(tree: &Tree, code: &str) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "import_statement" {
            scan_import_statement(child, code, &mut bindings);
        }
    }
    bindings
}

fn scan_import_statement(node: Node, code: &str, out: &mut Vec<ImportBinding>) {
    let Some(module) = source_of(node, code) else {
        return;
    };
    let range = Range::from_node(&node);
    let is_type_only = {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|c| c.kind() == "type")
    };

    let mut clause = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "import_clause" {
            clause = Some(child);
        }
    }
    let Some(clause) = clause else {
        out.push(ImportBinding {
            module,
            alias: None,
            imported: None,
            kind: ImportKind::SideEffect,
            is_type_only,
            range,
        });
        return;
    };

    let mut clause_cursor = clause.walk();
    for item in clause.children(&mut clause_cursor) {
        match item.kind() {
            "identifier" => {
                out.push(ImportBinding {
                    module: module.clone(),
                    alias: Some(node_text(&item, code).to_string()),
                    imported: Some("default".to_string()),
                    kind: ImportKind::Default,
                    is_type_only,
                    range,
                });
            }
            "namespace_import" => {
                let mut ns_cursor = item.walk();
                let alias = item
                    .children(&mut ns_cursor)
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(&c, code).to_string());
                out.push(ImportBinding {
                    module: module.clone(),
                    alias,
                    imported: None,
                    kind: ImportKind::Namespace,
                    is_type_only,
                    range,
                });
            }
            "named_imports" => {
                let mut named_cursor = item.walk();
                for spec in item.children(&mut named_cursor) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let name = spec
                        .child_by_field_name("name")
                        .map(|n| node_text(&n, code).to_string());
                    let alias = spec
                        .child_by_field_name("alias")
                        .map(|a| node_text(&a, code).to_string());
                    let Some(name) = name else { continue };
                    out.push(ImportBinding {
                        module: module.clone(),
                        alias: Some(alias.unwrap_or_else(|| name.clone())),
                        imported: Some(name),
                        kind: ImportKind::Named,
                        is_type_only,
                        range,
                    });
                }
            }
            _ => {}
        }
    }
}

/// One export declared by a module. Re-export variants carry the source
/// module; the resolver recurses into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportItem {
    /// `export function f` / `export const x` / `export class C`
    Direct { name: String },
    /// `export default <decl or expr>`; `original` is the declared name if any.
    Default { original: Option<String> },
    /// `export { a as b }` (no source): re-exposes a local binding.
    NamedLocal { name: String, alias: Option<String> },
    /// `export { a as b } from "m"`
    NamedReexport {
        name: String,
        alias: Option<String>,
        module: String,
    },
    /// `export * from "m"`
    StarReexport { module: String },
    /// `export * as ns from "m"`
    NamespaceReexport { alias: String, module: String },
}

/// Scan every export statement (plus exported declarations) in the file.
pub fn scan_exports(tree: &Tree, code: &str) -> Vec<ExportItem> {
    let mut items = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "export_statement" {
            scan_export_statement(child, code, &mut items);
        }
    }
    items
}

fn scan_export_statement(node: Node, code: &str, out: &mut Vec<ExportItem>) {
    let source = source_of(node, code);

    // `export default …`
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    let has_default = children.iter().any(|c| c.kind() == "default");
    if has_default {
        let original = node
            .child_by_field_name("declaration")
            .and_then(|decl| decl.child_by_field_name("name"))
            .map(|n| node_text(&n, code).to_string())
            .or_else(|| {
                children
                    .iter()
                    .find(|c| c.kind() == "identifier")
                    .map(|n| node_text(n, code).to_string())
            });
        out.push(ExportItem::Default { original });
        return;
    }

    // `export * as ns from "m"` / `export * from "m"`
    if let Some(module) = &source {
        for child in &children {
            if child.kind() == "namespace_export" {
                let mut ns_cursor = child.walk();
                if let Some(alias) = child
                    .children(&mut ns_cursor)
                    .find(|c| c.kind() == "identifier" || c.kind() == "string")
                    .map(|c| node_text(&c, code).trim_matches(['"', '\'']).to_string())
                {
                    out.push(ExportItem::NamespaceReexport {
                        alias,
                        module: module.clone(),
                    });
                    return;
                }
            }
        }
        if children.iter().any(|c| c.kind() == "*") {
            out.push(ExportItem::StarReexport {
                module: module.clone(),
            });
            return;
        }
    }

    // `export { a as b }` with or without a source
    for child in &children {
        if child.kind() != "export_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for spec in child.children(&mut clause_cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name) = spec
                .child_by_field_name("name")
                .map(|n| node_text(&n, code).to_string())
            else {
                continue;
            };
            let alias = spec
                .child_by_field_name("alias")
                .map(|a| node_text(&a, code).to_string());
            match &source {
                Some(module) => out.push(ExportItem::NamedReexport {
                    name,
                    alias,
                    module: module.clone(),
                }),
                None => out.push(ExportItem::NamedLocal { name, alias }),
            }
        }
        return;
    }

    // `export <declaration>` — one or more declared names.
    if let Some(decl) = node.child_by_field_name("declaration") {
        match decl.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut decl_cursor = decl.walk();
                for declarator in decl.children(&mut decl_cursor) {
                    if declarator.kind() == "variable_declarator" {
                        if let Some(name) = declarator
                            .child_by_field_name("name")
                            .filter(|n| n.kind() == "identifier")
                            .map(|n| node_text(&n, code).to_string())
                        {
                            out.push(ExportItem::Direct { name });
                        }
                    }
                }
            }
            _ => {
                if let Some(name) = decl
                    .child_by_field_name("name")
                    .map(|n| node_text(&n, code).to_string())
                {
                    out.push(ExportItem::Direct { name });
                }
            }
        }
    }
}

fn source_of(node: Node, code: &str) -> Option<String> {
    node.child_by_field_name("source")
        .map(|s| node_text(&s, code).trim_matches(['"', '\'', '`']).to_string())
}
