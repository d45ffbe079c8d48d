//! Symbol extraction: one File entity plus Symbol entities per declaration.
//!
//! The extractor walks the syntax tree and materializes entities for
//! top-level and class-member declarations. It never invents names:
//! declarations without a name are skipped. Ids are deterministic,
//! `sym:<relPath>#<name>@<shortHash(signature)>`, where the signature is the
//! declaration header so ids survive body-only edits.

use crate::entity::{
    FileEntity, Parameter, SymbolDetail, SymbolEntity, file_entity_id, symbol_entity_id,
};
use crate::parsing::Language;
use crate::parsing::parser::{check_recursion_depth, node_text};
use crate::types::{Range, SymbolKind, Visibility};
use crate::utils;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tree_sitter::{Node, Tree};

/// Result of extracting one file.
#[derive(Debug)]
pub struct ExtractedFile {
    pub file: FileEntity,
    pub symbols: Vec<SymbolEntity>,
    /// Variable and parameter type bindings (`name` → annotation or
    /// constructed type text), feeding receiver resolution.
    pub variable_types: HashMap<String, String>,
}

pub struct SymbolExtractor<'a> {
    code: &'a str,
    rel_path: &'a str,
    language: Language,
    content_hash: &'a str,
    now: DateTime<Utc>,
    symbols: Vec<SymbolEntity>,
    variable_types: HashMap<String, String>,
}

const CONFIG_BASENAMES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "jsconfig.json",
    "babel.config.js",
    "webpack.config.js",
    "vite.config.ts",
    "jest.config.js",
    "jest.config.ts",
    "rollup.config.js",
    ".eslintrc.js",
];

fn is_test_path(rel_path: &str) -> bool {
    rel_path.contains(".test.")
        || rel_path.contains(".spec.")
        || rel_path.split('/').any(|seg| seg == "__tests__" || seg == "tests" || seg == "test")
}

fn is_config_path(rel_path: &str) -> bool {
    let basename = rel_path.rsplit('/').next().unwrap_or(rel_path);
    CONFIG_BASENAMES.contains(&basename) || basename.contains(".config.")
}

impl<'a> SymbolExtractor<'a> {
    pub fn new(
        code: &'a str,
        rel_path: &'a str,
        language: Language,
        content_hash: &'a str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            rel_path,
            language,
            content_hash,
            now,
            symbols: Vec::new(),
            variable_types: HashMap::new(),
        }
    }

    pub fn extract(mut self, tree: &Tree) -> ExtractedFile {
        let root = tree.root_node();
        self.walk(root, false, 0);

        let extension = std::path::Path::new(self.rel_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_string();

        let file = FileEntity {
            id: file_entity_id(self.rel_path),
            path: self.rel_path.to_string(),
            hash: self.content_hash.to_string(),
            language: self.language,
            extension,
            lines: self.code.lines().count() as u32,
            size: self.code.len() as u64,
            dependencies: utils::extract_top_level_dependencies(self.code),
            is_test: is_test_path(self.rel_path),
            is_config: is_config_path(self.rel_path),
            created: self.now,
            last_modified: self.now,
        };

        ExtractedFile {
            file,
            symbols: self.symbols,
            variable_types: self.variable_types,
        }
    }

    fn walk(&mut self, node: Node, exported: bool, depth: usize) {
        if !check_recursion_depth(depth, node) {
            return;
        }
        match node.kind() {
            "export_statement" => {
                // `export default <expr>` without a declaration introduces
                // nothing; named declarations under the export are walked
                // with the exported flag set.
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.walk(child, true, depth + 1);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                self.extract_function(node, exported, None);
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.extract_class(node, exported);
            }
            "interface_declaration" => {
                self.extract_interface(node, exported);
            }
            "type_alias_declaration" => {
                self.extract_type_alias(node, exported);
            }
            "enum_declaration" => {
                self.extract_named(node, SymbolKind::Symbol, exported);
            }
            "module_declaration" | "namespace_declaration" | "internal_module" => {
                self.extract_named(node, SymbolKind::Symbol, exported);
                // Namespace bodies can nest further declarations.
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.walk(child, exported, depth + 1);
                    }
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == "variable_declarator" {
                        self.extract_variable(child, exported);
                    }
                }
            }
            "program" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.walk(child, false, depth + 1);
                }
            }
            _ => {
                // Recoverable fragments: tree-sitter puts unparsable
                // statements under ERROR nodes; their children may still be
                // clean declarations.
                if node.is_error() {
                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.walk(child, exported, depth + 1);
                    }
                }
            }
        }
    }

    // -- declaration handlers ---------------------------------------------

    fn extract_function(&mut self, node: Node, exported: bool, vis: Option<Visibility>) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let signature = self.signature_of(node);
        let parameters = self.extract_parameters(node);
        let return_type = self.annotation_text(node, "return_type");
        let is_async = has_keyword_child(node, "async");
        let is_generator = has_keyword_child(node, "*");
        let complexity = node
            .child_by_field_name("body")
            .map(|body| utils::complexity(&body))
            .unwrap_or(1);

        self.push_symbol(
            node,
            name,
            SymbolKind::Function,
            signature,
            exported,
            vis.unwrap_or_default(),
            SymbolDetail::Function {
                parameters,
                return_type,
                is_async,
                is_generator,
                complexity,
            },
        );
    }

    fn extract_class(&mut self, node: Node, exported: bool) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let signature = self.signature_of(node);
        let is_abstract =
            node.kind() == "abstract_class_declaration" || has_keyword_child(node, "abstract");

        let (extends, implements) = heritage_of(node, self.code);

        self.push_symbol(
            node,
            name,
            SymbolKind::Class,
            signature,
            exported,
            Visibility::Public,
            SymbolDetail::Class {
                extends,
                implements,
                is_abstract,
            },
        );

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.children(&mut cursor) {
                match member.kind() {
                    "method_definition" => {
                        let vis = member_visibility(member, self.code);
                        self.extract_function(member, exported, Some(vis));
                    }
                    "public_field_definition" | "property_definition" => {
                        self.extract_property(member, exported);
                    }
                    _ => {}
                }
            }
        }
    }

    fn extract_interface(&mut self, node: Node, exported: bool) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let signature = self.signature_of(node);
        let mut extends = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "extends_type_clause" | "extends_clause") {
                collect_type_names(child, self.code, &mut extends);
            }
        }
        self.push_symbol(
            node,
            name,
            SymbolKind::Interface,
            signature,
            exported,
            Visibility::Public,
            SymbolDetail::Interface { extends },
        );
    }

    fn extract_type_alias(&mut self, node: Node, exported: bool) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let signature = node_text(&node, self.code).trim().to_string();
        let aliased = node
            .child_by_field_name("value")
            .map(|v| node_text(&v, self.code).to_string())
            .unwrap_or_default();
        let value_kind = node.child_by_field_name("value").map(|v| v.kind());
        self.push_symbol(
            node,
            name,
            SymbolKind::TypeAlias,
            signature,
            exported,
            Visibility::Public,
            SymbolDetail::TypeAlias {
                is_union: value_kind == Some("union_type"),
                is_intersection: value_kind == Some("intersection_type"),
                aliased,
            },
        );
    }

    fn extract_property(&mut self, node: Node, exported: bool) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let signature = self.signature_of(node);
        let vis = member_visibility(node, self.code);
        if let Some(type_text) = self.annotation_text(node, "type") {
            self.variable_types.insert(name.clone(), type_text);
        }
        self.push_symbol(
            node,
            name,
            SymbolKind::Property,
            signature,
            exported,
            vis,
            SymbolDetail::None,
        );
    }

    fn extract_variable(&mut self, declarator: Node, exported: bool) {
        let Some(name_node) = declarator.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() != "identifier" {
            // Destructuring declarations introduce several bindings; the
            // dataflow pass tracks them, the entity stream does not.
            return;
        }
        let name = node_text(&name_node, self.code).to_string();
        if name.is_empty() {
            return;
        }

        // Record the binding's type for receiver resolution.
        if let Some(type_text) = self.annotation_text(declarator, "type") {
            self.variable_types.insert(name.clone(), type_text);
        } else if let Some(value) = declarator.child_by_field_name("value") {
            if value.kind() == "new_expression" {
                if let Some(ctor) = value.child_by_field_name("constructor") {
                    self.variable_types
                        .insert(name.clone(), node_text(&ctor, self.code).to_string());
                }
            }
        }

        // An arrow function bound to a name is a function symbol.
        if let Some(value) = declarator.child_by_field_name("value") {
            if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                let signature = self.declarator_signature(declarator, value);
                let parameters = self.extract_parameters(value);
                let return_type = self.annotation_text(value, "return_type");
                let is_async = has_keyword_child(value, "async");
                let complexity = value
                    .child_by_field_name("body")
                    .map(|body| utils::complexity(&body))
                    .unwrap_or(1);
                self.push_symbol_at(
                    declarator,
                    name,
                    SymbolKind::Function,
                    signature,
                    exported,
                    Visibility::Public,
                    SymbolDetail::Function {
                        parameters,
                        return_type,
                        is_async,
                        is_generator: false,
                        complexity,
                    },
                );
                return;
            }
        }

        let signature = self.declarator_signature_simple(declarator);
        self.push_symbol_at(
            declarator,
            name,
            SymbolKind::Variable,
            signature,
            exported,
            Visibility::Public,
            SymbolDetail::None,
        );
    }

    fn extract_named(&mut self, node: Node, kind: SymbolKind, exported: bool) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let signature = self.signature_of(node);
        self.push_symbol(
            node,
            name,
            kind,
            signature,
            exported,
            Visibility::Public,
            SymbolDetail::None,
        );
    }

    // -- helpers ----------------------------------------------------------

    fn name_of(&self, node: Node) -> Option<String> {
        let name_node = node.child_by_field_name("name")?;
        let name = node_text(&name_node, self.code);
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Declaration header: verbatim source from the declaration start to
    /// its body. Declarations without a body use their full text.
    fn signature_of(&self, node: Node) -> String {
        match node.child_by_field_name("body") {
            Some(body) => self
                .code
                .get(node.start_byte()..body.start_byte())
                .unwrap_or("")
                .trim()
                .to_string(),
            None => node_text(&node, self.code).trim().to_string(),
        }
    }

    fn declarator_signature(&self, declarator: Node, value: Node) -> String {
        // `const f = (a: T): R =>` — header runs through the arrow
        // function's parameter list and return type.
        let header_end = value
            .child_by_field_name("body")
            .map(|b| b.start_byte())
            .unwrap_or_else(|| value.end_byte());
        self.code
            .get(declarator.start_byte()..header_end)
            .unwrap_or("")
            .trim()
            .trim_end_matches("=>")
            .trim()
            .to_string()
    }

    fn declarator_signature_simple(&self, declarator: Node) -> String {
        match declarator.child_by_field_name("value") {
            Some(value) => self
                .code
                .get(declarator.start_byte()..value.start_byte())
                .unwrap_or("")
                .trim()
                .trim_end_matches('=')
                .trim()
                .to_string(),
            None => node_text(&declarator, self.code).trim().to_string(),
        }
    }

    /// Text of a `type_annotation` child field, without the leading colon.
    fn annotation_text(&self, node: Node, field: &str) -> Option<String> {
        let annotation = node.child_by_field_name(field)?;
        let text = node_text(&annotation, self.code)
            .trim_start_matches(':')
            .trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    fn extract_parameters(&mut self, node: Node) -> Vec<Parameter> {
        let mut params = Vec::new();
        let Some(list) = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"))
        else {
            return params;
        };
        if list.kind() == "identifier" {
            // Single-parameter arrow function without parentheses.
            params.push(Parameter {
                name: node_text(&list, self.code).to_string(),
                type_text: None,
                default_value: None,
                optional: false,
            });
            return params;
        }
        let mut cursor = list.walk();
        for child in list.children(&mut cursor) {
            match child.kind() {
                "required_parameter" | "optional_parameter" => {
                    let Some(pattern) = child.child_by_field_name("pattern") else {
                        continue;
                    };
                    let name = node_text(&pattern, self.code).to_string();
                    let type_text = self.annotation_text(child, "type");
                    if pattern.kind() == "identifier" {
                        if let Some(ref t) = type_text {
                            self.variable_types.insert(name.clone(), t.clone());
                        }
                    }
                    params.push(Parameter {
                        name,
                        type_text,
                        default_value: child
                            .child_by_field_name("value")
                            .map(|v| node_text(&v, self.code).to_string()),
                        optional: child.kind() == "optional_parameter",
                    });
                }
                "identifier" => {
                    params.push(Parameter {
                        name: node_text(&child, self.code).to_string(),
                        type_text: None,
                        default_value: None,
                        optional: false,
                    });
                }
                _ => {}
            }
        }
        params
    }

    fn push_symbol(
        &mut self,
        node: Node,
        name: String,
        kind: SymbolKind,
        signature: String,
        exported: bool,
        visibility: Visibility,
        detail: SymbolDetail,
    ) {
        self.push_symbol_at(node, name, kind, signature, exported, visibility, detail);
    }

    fn push_symbol_at(
        &mut self,
        node: Node,
        name: String,
        kind: SymbolKind,
        signature: String,
        exported: bool,
        visibility: Visibility,
        detail: SymbolDetail,
    ) {
        let doc_comment = leading_doc_comment(node, self.code);
        let is_deprecated = doc_comment
            .as_deref()
            .map(|doc| doc.to_lowercase().contains("@deprecated"))
            .unwrap_or(false);
        let signature = if signature.is_empty() {
            kind.as_str().to_string()
        } else {
            signature
        };
        self.symbols.push(SymbolEntity {
            id: symbol_entity_id(self.rel_path, &name, &signature),
            path: self.rel_path.to_string(),
            hash: self.content_hash.to_string(),
            language: self.language,
            name,
            kind,
            signature,
            doc_comment,
            visibility,
            is_exported: exported,
            is_deprecated,
            range: Range::from_node(&node),
            detail,
            created: self.now,
            last_modified: self.now,
        });
    }
}

fn has_keyword_child(node: Node, keyword: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == keyword)
}

fn member_visibility(node: Node, code: &str) -> Visibility {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            return match node_text(&child, code) {
                "private" => Visibility::Private,
                "protected" => Visibility::Protected,
                _ => Visibility::Public,
            };
        }
    }
    Visibility::Public
}

/// Extract `(extends, implements)` targets of a class heritage clause.
pub fn heritage_of(class_node: Node, code: &str) -> (Option<String>, Vec<String>) {
    let mut extends = None;
    let mut implements = Vec::new();
    let mut cursor = class_node.walk();
    for child in class_node.children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let mut heritage_cursor = child.walk();
        for clause in child.children(&mut heritage_cursor) {
            match clause.kind() {
                "extends_clause" => {
                    let mut names = Vec::new();
                    collect_type_names(clause, code, &mut names);
                    extends = names.into_iter().next();
                }
                "implements_clause" => {
                    collect_type_names(clause, code, &mut implements);
                }
                // The plain JS grammar puts the expression directly under
                // class_heritage.
                "identifier" | "member_expression" => {
                    extends = Some(node_text(&clause, code).to_string());
                }
                _ => {}
            }
        }
    }
    (extends, implements)
}

/// Collect identifier-like type names directly under a heritage clause,
/// stripping generic arguments.
fn collect_type_names(node: Node, code: &str, out: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" | "type_identifier" => {
                out.push(node_text(&child, code).to_string());
            }
            "generic_type" => {
                if let Some(name) = child.child_by_field_name("name") {
                    out.push(node_text(&name, code).to_string());
                }
            }
            "member_expression" | "nested_type_identifier" => {
                out.push(node_text(&child, code).to_string());
            }
            _ => {}
        }
    }
}

/// Leading comment block(s) immediately preceding a declaration, joined by
/// line breaks. Walks back through contiguous comment siblings; an export
/// wrapper is transparent.
pub fn leading_doc_comment(node: Node, code: &str) -> Option<String> {
    // For declarations wrapped in `export …`, the comment precedes the
    // export statement.
    let anchor = match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => node,
    };
    let mut blocks: Vec<String> = Vec::new();
    let mut prev = anchor.prev_sibling();
    let mut expected_end = anchor.start_position().row;
    while let Some(candidate) = prev {
        if candidate.kind() != "comment" {
            break;
        }
        // Only comments ending on the line directly above (or same line)
        // count as leading documentation.
        let gap = expected_end.saturating_sub(candidate.end_position().row);
        if gap > 1 {
            break;
        }
        blocks.push(node_text(&candidate, code).to_string());
        expected_end = candidate.start_position().row;
        prev = candidate.prev_sibling();
    }
    if blocks.is_empty() {
        return None;
    }
    blocks.reverse();
    Some(blocks.join("\n"))
}
