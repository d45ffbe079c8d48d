//! File-scoped reference, read, and write edges.
//!
//! Walks every descendant of the file and emits REFERENCES, TYPE_USES,
//! READS, and WRITES with the enclosing declaration as source (or the file
//! itself at top level). Declaration names, call callees, and import
//! specifier names are skipped here — they are covered by the symbol
//! extractor, the call pass, and the import pass respectively.

use super::{EdgeDraft, RelationshipBuilder, ResolvedTarget, calls::receiver_root};
use crate::budget::CheckerContext;
use crate::parsing::check_recursion_depth;
use crate::relationship::{Metadata, RelationKind, Resolution, TargetScope};
use crate::types::Range;
use tree_sitter::{Node, Tree};

impl<'a> RelationshipBuilder<'a> {
    pub(crate) fn emit_dataflow_edges(&mut self, tree: &Tree) {
        self.scan_node(tree.root_node(), 0);
    }

    fn scan_node(&mut self, node: Node, depth: usize) {
        if !check_recursion_depth(depth, node) {
            return;
        }
        match node.kind() {
            // Covered elsewhere, or never edge-worthy.
            "import_statement" | "export_clause" | "class_heritage" | "extends_type_clause"
            | "implements_clause" | "decorator" | "comment" => {}

            "call_expression" => {
                // The callee produced a CALLS edge already; arguments can
                // still contain references and nested expressions.
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.scan_node(args, depth + 1);
                }
            }

            "new_expression" => {
                self.process_instantiation(node);
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.scan_node(args, depth + 1);
                }
            }

            "assignment_expression" | "augmented_assignment_expression" => {
                self.process_assignment(node);
            }

            "type_annotation" => {
                if !is_signature_annotation(node) {
                    self.emit_type_uses(node);
                }
            }

            "identifier" => {
                self.maybe_identifier_reference(node);
            }

            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.children(&mut cursor).collect();
                for child in children {
                    self.scan_node(child, depth + 1);
                }
            }
        }
    }

    // -- instantiations ---------------------------------------------------

    fn process_instantiation(&mut self, node: Node) {
        let Some(ctor) = node.child_by_field_name("constructor") else {
            return;
        };
        let Some(root) = receiver_root(ctor) else {
            return;
        };
        if root.kind() != "identifier" {
            return;
        }
        let name = self.text(&root).to_string();
        if name.is_empty() || self.is_stop_name(&name) {
            return;
        }
        let site = Range::from_node(&node);
        let from = self.enclosing_entity_id(&site);
        let target = self.resolve_name(&name, CheckerContext::Reference, "class");
        let mut metadata = self.ladder_metadata(&target);
        metadata.set("kind", "instantiation");
        self.sink.push(EdgeDraft {
            from,
            kind: RelationKind::References,
            to: target.id.clone(),
            metadata,
            site: Some(site),
            used_checker: target.used_checker,
        });
    }

    // -- type references --------------------------------------------------

    fn emit_type_uses(&mut self, annotation: Node) {
        let mut names = Vec::new();
        collect_type_identifiers(annotation, self.code, &mut names);
        let site = Range::from_node(&annotation);
        let from = self.enclosing_entity_id(&site);
        for name in names {
            if self.is_stop_name(&name) || name.len() < self.config.ast_min_name_length {
                continue;
            }
            let target = self.resolve_name(&name, CheckerContext::Reference, "external");
            let mut metadata = self.ladder_metadata(&target);
            metadata.set("kind", "type");
            self.sink.push(EdgeDraft {
                from: from.clone(),
                kind: RelationKind::TypeUses,
                to: target.id.clone(),
                metadata,
                site: Some(site),
                used_checker: target.used_checker,
            });
        }
    }

    // -- plain identifier references --------------------------------------

    fn maybe_identifier_reference(&mut self, node: Node) {
        if is_declaration_name(node) {
            return;
        }
        let name = self.text(&node).to_string();
        if name.is_empty()
            || self.is_stop_name(&name)
            || name.len() < self.config.ast_min_name_length
        {
            return;
        }
        let site = Range::from_node(&node);
        let from = self.enclosing_entity_id(&site);
        let target = self.resolve_name(&name, CheckerContext::Reference, "external");
        let mut metadata = self.ladder_metadata(&target);
        self.apply_short_name_penalty(&mut metadata, &name);
        metadata.set("kind", "identifier");
        self.sink.push(EdgeDraft {
            from,
            kind: RelationKind::References,
            to: target.id.clone(),
            metadata,
            site: Some(site),
            used_checker: target.used_checker,
        });
    }

    /// Identifier references barely above the minimum length are weak
    /// evidence; shave their confidence so the gate can cull them when the
    /// target is unresolved.
    fn apply_short_name_penalty(&mut self, metadata: &mut Metadata, name: &str) {
        if name.len() <= self.config.ast_min_name_length {
            if let Some(confidence) = metadata.get_f64("confidence") {
                metadata.set("confidence", (confidence - 0.1).max(0.0));
            }
        }
    }

    // -- assignments ------------------------------------------------------

    fn process_assignment(&mut self, node: Node) {
        let operator = if node.kind() == "augmented_assignment_expression" {
            node.child_by_field_name("operator")
                .map(|op| self.text(&op).to_string())
                .unwrap_or_else(|| "=".to_string())
        } else {
            "=".to_string()
        };
        let site = Range::from_node(&node);
        let from = self.enclosing_entity_id(&site);

        if let Some(left) = node.child_by_field_name("left") {
            self.process_write_target(left, &from, &operator, &site);
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.scan_reads(right, &from, &site, 0);
        }
    }

    fn process_write_target(&mut self, left: Node, from: &str, operator: &str, site: &Range) {
        match left.kind() {
            "identifier" => {
                let name = self.text(&left).to_string();
                if name.is_empty() || self.is_stop_name(&name) {
                    return;
                }
                let target = self.resolve_name(&name, CheckerContext::Reference, "external");
                self.push_write(from, target, &name, operator, self.text(&left), site);
            }
            "member_expression" => {
                self.process_property_write(left, from, operator, site);
            }
            "object_pattern" | "array_pattern" => {
                let mut names = Vec::new();
                collect_pattern_identifiers(left, self.code, &mut names);
                for name in names {
                    if name.is_empty() || self.is_stop_name(&name) {
                        continue;
                    }
                    let target = self.resolve_name(&name, CheckerContext::Reference, "external");
                    self.push_write(from, target, &name, operator, &name, site);
                }
            }
            "parenthesized_expression" => {
                if let Some(inner) = left.named_child(0) {
                    self.process_write_target(inner, from, operator, site);
                }
            }
            "subscript_expression" => {
                // arr[i] = x writes through the container.
                if let Some(root) = receiver_root(left) {
                    if root.kind() == "identifier" {
                        let name = self.text(&root).to_string();
                        if !name.is_empty() && !self.is_stop_name(&name) {
                            let target =
                                self.resolve_name(&name, CheckerContext::Reference, "external");
                            self.push_write(from, target, &name, operator, self.text(&left), site);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Property writes `a.b = …` resolve through the receiver's type, the
    /// import map, the current file's own members, then fall external.
    fn process_property_write(&mut self, left: Node, from: &str, operator: &str, site: &Range) {
        let Some(property) = left.child_by_field_name("property") else {
            return;
        };
        let prop_name = self.text(&property).to_string();
        if prop_name.is_empty() || self.is_stop_name(&prop_name) {
            return;
        }
        let root_name = left
            .child_by_field_name("object")
            .and_then(receiver_root)
            .filter(|r| r.kind() == "identifier")
            .map(|r| self.text(&r).to_string());

        // 1. Receiver type through the oracle.
        if let (Some(root), Some(oracle)) = (&root_name, self.oracle) {
            let hints = crate::budget::ContextHints {
                imported: self.variable_types.contains_key(root.as_str()),
                ambiguous: self.cache.lookup_by_name(&prop_name).len() > 1,
                name_length: prop_name.len(),
            };
            if self
                .budget
                .should_use_type_checker(CheckerContext::Reference, hints)
                && self.budget.take_budget()
            {
                if let Some(type_text) = oracle.receiver_type(root, self.variable_types) {
                    if let Some(type_name) = crate::resolver::base_type_name(&type_text) {
                        if let Some(res) =
                            oracle.symbol_for_name(&type_name, self.rel_path, self.cache)
                        {
                            let to = match self.cache.lookup_symbol(&res.file, &prop_name) {
                                Some(symbol) => symbol.id.clone(),
                                None => format!("file:{}:{}", res.file, prop_name),
                            };
                            let target = ResolvedTarget {
                                id: to,
                                resolution: Resolution::TypeChecker,
                                scope: TargetScope::Imported,
                                used_checker: true,
                                import_depth: None,
                                is_exported: false,
                                ambiguous: false,
                                candidate_count: 1,
                            };
                            self.push_write(
                                from,
                                target,
                                &prop_name,
                                operator,
                                self.text(&left),
                                site,
                            );
                            return;
                        }
                    }
                }
            }
        }

        // 2. Import map on the root.
        if let Some(root) = &root_name {
            if self.imports.import_map.contains_key(root.as_str()) {
                if let Some(found) =
                    self.resolver
                        .resolve_imported_member(root, &prop_name, self.imports, self.cache)
                {
                    let to = match self
                        .cache
                        .lookup_symbol(&found.file, &found.original_name)
                    {
                        Some(symbol) => symbol.id.clone(),
                        None => format!("file:{}:{}", found.file, found.original_name),
                    };
                    let target = ResolvedTarget {
                        id: to,
                        resolution: Resolution::ViaImport,
                        scope: TargetScope::Imported,
                        used_checker: false,
                        import_depth: Some(found.depth),
                        is_exported: true,
                        ambiguous: false,
                        candidate_count: 1,
                    };
                    self.push_write(from, target, &prop_name, operator, self.text(&left), site);
                    return;
                }
            }
        }

        // 3. Same-file members sharing the property name.
        let same_file: Vec<_> = self
            .cache
            .lookup_by_name(&prop_name)
            .iter()
            .filter(|s| s.path == self.rel_path)
            .map(|s| (s.id.clone(), s.is_exported))
            .collect();
        let local_symbol = self
            .local_index
            .get(prop_name.as_str())
            .map(|s| (s.id.clone(), s.is_exported));
        if let Some((id, is_exported)) = local_symbol.or_else(|| same_file.first().cloned()) {
            let ambiguous = same_file.len() > 1;
            let target = ResolvedTarget {
                id,
                resolution: Resolution::Heuristic,
                scope: TargetScope::Local,
                used_checker: false,
                import_depth: None,
                is_exported,
                ambiguous,
                candidate_count: same_file.len().max(1),
            };
            self.push_write(from, target, &prop_name, operator, self.text(&left), site);
            return;
        }

        // 4. External placeholder.
        let target = ResolvedTarget::placeholder(format!("external:{prop_name}"));
        self.push_write(from, target, &prop_name, operator, self.text(&left), site);
    }

    fn push_write(
        &mut self,
        from: &str,
        target: ResolvedTarget,
        variable: &str,
        operator: &str,
        access_path: &str,
        site: &Range,
    ) {
        let mut metadata = self.ladder_metadata(&target);
        metadata.set("kind", "write");
        metadata.set("operator", operator);
        if access_path != variable {
            metadata.set("accessPath", access_path);
        }
        metadata.set("dataFlowId", self.data_flow_id(from, variable));
        self.sink.push(EdgeDraft {
            from: from.to_string(),
            kind: RelationKind::Writes,
            to: target.id.clone(),
            metadata,
            site: Some(*site),
            used_checker: target.used_checker,
        });
    }

    /// Reads on the right-hand side of an assignment: identifiers and the
    /// roots of property accesses, with the same resolution ladder.
    fn scan_reads(&mut self, node: Node, from: &str, site: &Range, depth: usize) {
        if !check_recursion_depth(depth, node) {
            return;
        }
        match node.kind() {
            "identifier" => {
                let name = self.text(&node).to_string();
                if name.is_empty()
                    || self.is_stop_name(&name)
                    || name.len() < self.config.ast_min_name_length
                {
                    return;
                }
                let target = self.resolve_name(&name, CheckerContext::Reference, "external");
                let mut metadata = self.ladder_metadata(&target);
                metadata.set("kind", "read");
                metadata.set("dataFlowId", self.data_flow_id(from, &name));
                self.sink.push(EdgeDraft {
                    from: from.to_string(),
                    kind: RelationKind::Reads,
                    to: target.id.clone(),
                    metadata,
                    site: Some(*site),
                    used_checker: target.used_checker,
                });
            }
            "member_expression" => {
                // Only the storage root reads; property names alone are not
                // resolvable locations.
                if let Some(root) = receiver_root(node) {
                    if root.kind() == "identifier" {
                        self.scan_reads(root, from, site, depth + 1);
                    }
                }
            }
            "call_expression" => {
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.scan_reads(args, from, site, depth + 1);
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.children(&mut cursor).collect();
                for child in children {
                    self.scan_reads(child, from, site, depth + 1);
                }
            }
        }
    }
}

/// Whether an annotation hangs off a function signature (parameter or
/// return type), which PARAM_TYPE / RETURNS_TYPE already cover.
fn is_signature_annotation(annotation: Node) -> bool {
    let Some(parent) = annotation.parent() else {
        return false;
    };
    if matches!(parent.kind(), "required_parameter" | "optional_parameter") {
        return true;
    }
    parent
        .child_by_field_name("return_type")
        .map(|rt| rt.id() == annotation.id())
        .unwrap_or(false)
}

/// Whether this identifier node is the name being introduced by its parent
/// declaration (or a key/label position that never references storage).
fn is_declaration_name(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if let Some(name) = parent.child_by_field_name("name") {
        if name.id() == node.id() {
            return true;
        }
    }
    if let Some(pattern) = parent.child_by_field_name("pattern") {
        if pattern.id() == node.id() {
            return true;
        }
    }
    if let Some(key) = parent.child_by_field_name("key") {
        if key.id() == node.id() {
            return true;
        }
    }
    matches!(parent.kind(), "import_specifier" | "export_specifier")
}

fn collect_type_identifiers(node: Node, code: &str, out: &mut Vec<String>) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "type_identifier" {
            let text = crate::parsing::node_text(&current, code);
            if !text.is_empty() && !out.iter().any(|n| n == text) {
                out.push(text.to_string());
            }
            continue;
        }
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            stack.push(child);
        }
    }
    out.reverse();
}

fn collect_pattern_identifiers(pattern: Node, code: &str, out: &mut Vec<String>) {
    let mut stack = vec![pattern];
    while let Some(current) = stack.pop() {
        match current.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                out.push(crate::parsing::node_text(&current, code).to_string());
                continue;
            }
            "pair_pattern" => {
                // `{ key: binding }` introduces the binding, not the key.
                if let Some(value) = current.child_by_field_name("value") {
                    stack.push(value);
                }
                continue;
            }
            _ => {}
        }
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            stack.push(child);
        }
    }
    out.reverse();
}
