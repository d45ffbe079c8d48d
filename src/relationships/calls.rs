//! Call-site extraction: CALLS edges, their parallel REFERENCES, derived
//! DEPENDS_ON edges, and heuristic WRITES for mutating method calls.

use super::{EdgeDraft, MUTATOR_METHODS, RelationshipBuilder, ResolvedTarget, confidence_for};
use crate::budget::{CheckerContext, ContextHints};
use crate::relationship::{Metadata, RelationKind, Resolution, TargetScope};
use crate::resolver::checker::{base_type_name, is_union_type};
use crate::types::{Range, SymbolKind};
use tree_sitter::{Node, Tree};

impl<'a> RelationshipBuilder<'a> {
    pub(crate) fn emit_call_edges(&mut self, tree: &Tree) {
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            // Decorator expressions are resolved by the decorator pass.
            if matches!(node.kind(), "import_statement" | "decorator") {
                continue;
            }
            if node.kind() == "call_expression" {
                self.process_call(node);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    fn process_call(&mut self, call: Node) {
        let Some(callee) = call.child_by_field_name("function") else {
            return;
        };
        let site = Range::from_node(&call);
        let from = self.enclosing_entity_id(&site);
        let arity = call
            .child_by_field_name("arguments")
            .map(|args| args.named_child_count() as u64)
            .unwrap_or(0);
        let awaited = is_awaited(call);
        let access_path = self.text(&callee).to_string();

        match callee.kind() {
            "identifier" => {
                let name = self.text(&callee).to_string();
                if self.is_stop_name(&name) {
                    return;
                }
                let min_len = self.config.ast_min_name_length;
                let target = self.resolve_name(&name, CheckerContext::Call, "external");
                if target.id.starts_with("external:") && name.len() < min_len {
                    return;
                }
                self.push_call(from, target, site, arity, awaited, access_path, false, false);
            }
            "member_expression" => {
                self.process_method_call(call, callee, from, site, arity, awaited, access_path);
            }
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_method_call(
        &mut self,
        _call: Node,
        callee: Node,
        from: String,
        site: Range,
        arity: u64,
        awaited: bool,
        access_path: String,
    ) {
        let Some(property) = callee.child_by_field_name("property") else {
            return;
        };
        let method = self.text(&property).to_string();
        let Some(object) = callee.child_by_field_name("object") else {
            return;
        };
        let root = receiver_root(object);
        let root_text = root.map(|r| self.text(&r).to_string()).unwrap_or_default();
        if self.is_stop_name(&root_text) || self.is_stop_name(&method) {
            return;
        }

        let mut dynamic_dispatch = false;
        let target = if self.imports.import_map.contains_key(root_text.as_str()) {
            // Imported alias (namespace import or imported object).
            match self
                .resolver
                .resolve_imported_member(&root_text, &method, self.imports, self.cache)
            {
                Some(found) => {
                    let (id, is_exported) = match self
                        .cache
                        .lookup_symbol(&found.file, &found.original_name)
                    {
                        Some(symbol) => (symbol.id.clone(), symbol.is_exported),
                        None => (format!("file:{}:{}", found.file, found.original_name), true),
                    };
                    Some(ResolvedTarget {
                        id,
                        resolution: Resolution::ViaImport,
                        scope: TargetScope::Imported,
                        used_checker: false,
                        import_depth: Some(found.depth),
                        is_exported,
                        ambiguous: false,
                        candidate_count: 1,
                    })
                }
                None => None,
            }
        } else {
            // Receiver's declared type through the budgeted oracle.
            self.resolve_receiver_method(&root_text, &method, &mut dynamic_dispatch)
        };

        let target = match target {
            Some(target) => target,
            None => {
                if method.len() < self.config.ast_min_name_length
                    || MUTATOR_METHODS.contains(&method.as_str())
                {
                    // An unresolvable mutator callee still produces its
                    // WRITES edge below, just no CALLS placeholder.
                    self.maybe_emit_mutator_write(&method, object, &from, &site, &access_path);
                    return;
                }
                ResolvedTarget::placeholder(format!("external:{method}"))
            }
        };

        self.push_call(
            from.clone(),
            target,
            site,
            arity,
            awaited,
            access_path.clone(),
            true,
            dynamic_dispatch,
        );
        self.maybe_emit_mutator_write(&method, object, &from, &site, &access_path);
    }

    /// Resolve `obj.m()` through the receiver's declared type: the oracle
    /// maps the receiver to a type name, the type to its declaring file, and
    /// the method to `file:<declFile>:<m>`.
    fn resolve_receiver_method(
        &mut self,
        root: &str,
        method: &str,
        dynamic_dispatch: &mut bool,
    ) -> Option<ResolvedTarget> {
        let oracle = self.oracle?;
        if root.is_empty() {
            return None;
        }
        // A receiver with a known type binding is the property-call
        // analogue of an imported callee: the one case where a checker
        // query is likely to land.
        let hints = ContextHints {
            imported: self.variable_types.contains_key(root),
            ambiguous: self.cache.lookup_by_name(method).len() > 1,
            name_length: method.len(),
        };
        if !self
            .budget
            .should_use_type_checker(CheckerContext::Call, hints)
            || !self.budget.take_budget()
        {
            return None;
        }
        let type_text = oracle.receiver_type(root, self.variable_types)?;
        if is_union_type(&type_text) {
            *dynamic_dispatch = true;
        }
        let type_name = base_type_name(&type_text)?;

        // Declaring file of the receiver type: local first, then project-wide.
        let decl = if let Some(symbol) = self.local_index.get(type_name.as_str()) {
            Some((symbol.path.clone(), symbol.kind))
        } else {
            oracle
                .symbol_for_name(&type_name, self.rel_path, self.cache)
                .and_then(|res| {
                    self.cache
                        .lookup_symbol(&res.file, &res.name)
                        .map(|s| (s.path.clone(), s.kind))
                })
        };
        let (decl_file, type_kind) = decl?;
        if type_kind == SymbolKind::Interface {
            *dynamic_dispatch = true;
        }

        let (id, is_exported) = match self.cache.lookup_symbol(&decl_file, method) {
            Some(symbol) => (symbol.id.clone(), symbol.is_exported),
            None => (format!("file:{decl_file}:{method}"), false),
        };
        let scope = if decl_file == self.rel_path {
            TargetScope::Local
        } else {
            TargetScope::Imported
        };
        Some(ResolvedTarget {
            id,
            resolution: Resolution::TypeChecker,
            scope,
            used_checker: true,
            import_depth: None,
            is_exported,
            ambiguous: false,
            candidate_count: 1,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn push_call(
        &mut self,
        from: String,
        target: ResolvedTarget,
        site: Range,
        arity: u64,
        awaited: bool,
        access_path: String,
        is_method: bool,
        dynamic_dispatch: bool,
    ) {
        let mut metadata = self.ladder_metadata(&target);
        metadata.set("arity", arity);
        metadata.set("awaited", awaited);
        metadata.set("accessPath", access_path.as_str());
        if is_method {
            metadata.set("isMethod", true);
        }
        if dynamic_dispatch {
            metadata.set("dynamicDispatch", true);
        }

        self.sink.push(EdgeDraft {
            from: from.clone(),
            kind: RelationKind::Calls,
            to: target.id.clone(),
            metadata,
            site: Some(site),
            used_checker: target.used_checker,
        });

        // Parallel reference for every aggregated call.
        let mut ref_metadata = self.ladder_metadata(&target);
        ref_metadata.set("kind", "reference");
        ref_metadata.set("via", if is_method { "method" } else { "call" });
        self.sink.push(EdgeDraft {
            from: from.clone(),
            kind: RelationKind::References,
            to: target.id.clone(),
            metadata: ref_metadata,
            site: Some(site),
            used_checker: target.used_checker,
        });

        // Imported targets also register a dependency, inheriting the call
        // edge's confidence.
        if target.scope == TargetScope::Imported {
            let mut dep_metadata = Metadata::new();
            dep_metadata.set("resolution", target.resolution.as_str());
            dep_metadata.set("scope", target.scope.as_str());
            dep_metadata.set(
                "confidence",
                confidence_for(
                    target.resolution,
                    target.scope,
                    target.is_exported,
                    target.import_depth,
                ) as f64,
            );
            dep_metadata.set("inferred", true);
            self.sink.push(EdgeDraft {
                from,
                kind: RelationKind::DependsOn,
                to: target.id,
                metadata: dep_metadata,
                site: None,
                used_checker: target.used_checker,
            });
        }
    }

    /// Mutating method calls (`a.items.push(1)`) write to their receiver.
    fn maybe_emit_mutator_write(
        &mut self,
        method: &str,
        object: Node,
        from: &str,
        site: &Range,
        access_path: &str,
    ) {
        if !MUTATOR_METHODS.contains(&method) {
            return;
        }
        let Some(root) = receiver_root(object) else {
            return;
        };
        if root.kind() != "identifier" {
            return;
        }
        // The mutated location is the receiver itself for `arr.push(…)`,
        // or its property for `a.items.push(…)`.
        let written_name = match object.kind() {
            "identifier" => self.text(&object).to_string(),
            "member_expression" => match object.child_by_field_name("property") {
                Some(prop) => self.text(&prop).to_string(),
                None => return,
            },
            _ => return,
        };
        if written_name.is_empty() || self.is_stop_name(&written_name) {
            return;
        }

        let target = self.resolve_name(&written_name, CheckerContext::Reference, "external");
        let mut metadata = self.ladder_metadata(&target);
        metadata.set("kind", "write");
        metadata.set("operator", "mutate");
        metadata.set("accessPath", access_path);
        metadata.set("dataFlowId", self.data_flow_id(from, &written_name));
        self.sink.push(EdgeDraft {
            from: from.to_string(),
            kind: RelationKind::Writes,
            to: target.id,
            metadata,
            site: Some(*site),
            used_checker: target.used_checker,
        });
    }

    /// Dataflow group id for reads/writes of one logical storage location.
    pub(crate) fn data_flow_id(&self, enclosing_id: &str, variable: &str) -> String {
        format!(
            "df_{}",
            crate::utils::short_hash(&format!(
                "{}|{}|{}",
                self.rel_path, enclosing_id, variable
            ))
        )
    }
}

/// Leftmost identifier (or `this`) of a receiver expression.
pub(crate) fn receiver_root(node: Node) -> Option<Node> {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" | "this" => return Some(current),
            "member_expression" | "subscript_expression" => {
                current = current.child_by_field_name("object")?;
            }
            "parenthesized_expression" => {
                current = current.named_child(0)?;
            }
            _ => return None,
        }
    }
}

/// Whether a call appears under an `await`, looking transparently through
/// parentheses.
fn is_awaited(call: Node) -> bool {
    let mut current = call;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "await_expression" => return true,
            "parenthesized_expression" => current = parent,
            _ => return false,
        }
    }
    false
}
