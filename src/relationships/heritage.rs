//! Inheritance, override, decorator, throw, and signature-type edges.

use super::{EdgeDraft, RelationshipBuilder, ResolvedTarget, dependency_confidence};
use crate::budget::{CheckerContext, ContextHints};
use crate::entity::{EntityRef, SymbolDetail, parse_entity_id};
use crate::relationship::{Metadata, RelationKind, Resolution, TargetScope};
use crate::resolver::checker::base_type_name;
use crate::types::{Range, SymbolKind};
use tree_sitter::{Node, Tree};

impl<'a> RelationshipBuilder<'a> {
    // -- EXTENDS / IMPLEMENTS / OVERRIDES ---------------------------------

    pub(crate) fn emit_heritage_edges(&mut self) {
        struct ClassInfo {
            id: String,
            range: Range,
            extends: Option<String>,
            implements: Vec<String>,
        }
        let mut classes = Vec::new();
        let mut interfaces = Vec::new();
        for symbol in self.symbols {
            match &symbol.detail {
                SymbolDetail::Class {
                    extends,
                    implements,
                    ..
                } => classes.push(ClassInfo {
                    id: symbol.id.clone(),
                    range: symbol.range,
                    extends: extends.clone(),
                    implements: implements.clone(),
                }),
                SymbolDetail::Interface { extends } => {
                    interfaces.push((symbol.id.clone(), extends.clone()));
                }
                _ => {}
            }
        }

        for class in classes {
            if let Some(base) = &class.extends {
                let base = simple_heritage_name(base);
                let target = self.resolve_name(&base, CheckerContext::Heritage, "class");
                let used_checker = target.used_checker;
                self.push_heritage(class.id.clone(), RelationKind::Extends, &target);
                self.emit_override_edges(&class.id, &class.range, &target, used_checker);
            }
            for interface in &class.implements {
                let name = simple_heritage_name(interface);
                let target = self.resolve_name(&name, CheckerContext::Heritage, "interface");
                self.push_heritage(class.id.clone(), RelationKind::Implements, &target);
            }
        }
        for (id, extends) in interfaces {
            for parent in extends {
                let name = simple_heritage_name(&parent);
                let target = self.resolve_name(&name, CheckerContext::Heritage, "interface");
                self.push_heritage(id.clone(), RelationKind::Extends, &target);
            }
        }
    }

    fn push_heritage(&mut self, from: String, kind: RelationKind, target: &ResolvedTarget) {
        let metadata = self.ladder_metadata(target);
        self.sink.push(EdgeDraft {
            from,
            kind,
            to: target.id.clone(),
            metadata,
            site: None,
            used_checker: target.used_checker,
        });
    }

    /// Methods of a class whose base resolves to a file override the base's
    /// member of the same name. Constructors are skipped.
    fn emit_override_edges(
        &mut self,
        class_id: &str,
        class_range: &Range,
        base: &ResolvedTarget,
        used_checker: bool,
    ) {
        let base_file = match declaring_file_of(&base.id) {
            Some(file) => file,
            None => return,
        };
        let methods: Vec<(String, String)> = self
            .symbols
            .iter()
            .filter(|s| {
                s.kind == SymbolKind::Function
                    && s.id != class_id
                    && class_range.encloses(&s.range)
                    && s.name != "constructor"
            })
            .map(|s| (s.id.clone(), s.name.clone()))
            .collect();

        for (method_id, method_name) in methods {
            let to = match self.cache.lookup_symbol(&base_file, &method_name) {
                Some(symbol) => symbol.id.clone(),
                None => format!("file:{base_file}:{method_name}"),
            };
            let mut metadata = Metadata::new();
            metadata.set("resolution", base.resolution.as_str());
            metadata.set("scope", base.scope.as_str());
            metadata.set(
                "confidence",
                super::confidence_for(base.resolution, base.scope, base.is_exported, None) as f64,
            );
            if base.resolution != Resolution::Direct {
                metadata.set("inferred", true);
            }
            if used_checker {
                metadata.set("usedTypeChecker", true);
            }
            self.sink.push(EdgeDraft {
                from: method_id,
                kind: RelationKind::Overrides,
                to,
                metadata,
                site: None,
                used_checker,
            });
        }
    }

    // -- decorators -------------------------------------------------------

    pub(crate) fn emit_decorator_edges(&mut self, tree: &Tree) {
        let mut sites = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "decorator" {
                if let Some(name) = self.decorator_name(node) {
                    sites.push((name, Range::from_node(&node)));
                }
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }

        for (name, site) in sites {
            if self.is_stop_name(&name) {
                continue;
            }
            let from = self.enclosing_entity_id(&site);
            // Decorators resolve checker-first: the expression is frequently
            // an imported factory whose identity the AST alone cannot pin.
            let target = self.resolve_decorator(&name);
            let mut metadata = self.ladder_metadata(&target);
            metadata.set("kind", "decorator");
            self.sink.push(EdgeDraft {
                from,
                kind: RelationKind::References,
                to: target.id.clone(),
                metadata,
                site: Some(site),
                used_checker: target.used_checker,
            });
        }
    }

    fn decorator_name(&self, decorator: Node) -> Option<String> {
        let expr = decorator.named_child(0)?;
        let root = match expr.kind() {
            "identifier" => expr,
            "call_expression" => {
                let callee = expr.child_by_field_name("function")?;
                super::calls::receiver_root(callee)?
            }
            "member_expression" => super::calls::receiver_root(expr)?,
            _ => return None,
        };
        let name = self.text(&root).to_string();
        if name.is_empty() { None } else { Some(name) }
    }

    fn resolve_decorator(&mut self, name: &str) -> ResolvedTarget {
        let imported = self.imports.import_map.contains_key(name);
        let hints = ContextHints {
            imported,
            ambiguous: self.cache.lookup_by_name(name).len() > 1,
            name_length: name.len(),
        };
        if let Some(oracle) = self.oracle {
            if self
                .budget
                .should_use_type_checker(CheckerContext::Decorator, hints)
                && self.budget.take_budget()
            {
                if let Some(res) = oracle.symbol_for_name(name, self.rel_path, self.cache) {
                    let (id, is_exported) = match self.cache.lookup_symbol(&res.file, &res.name) {
                        Some(symbol) => (symbol.id.clone(), symbol.is_exported),
                        None => (format!("file:{}:{}", res.file, res.name), false),
                    };
                    return ResolvedTarget {
                        id,
                        resolution: Resolution::TypeChecker,
                        scope: TargetScope::Imported,
                        used_checker: true,
                        import_depth: None,
                        is_exported,
                        ambiguous: false,
                        candidate_count: 1,
                    };
                }
            }
        }
        if imported {
            if let Some(found) =
                self.resolver
                    .resolve_imported_member(name, name, self.imports, self.cache)
            {
                let (id, is_exported) = match self
                    .cache
                    .lookup_symbol(&found.file, &found.original_name)
                {
                    Some(symbol) => (symbol.id.clone(), symbol.is_exported),
                    None => (format!("file:{}:{}", found.file, found.original_name), true),
                };
                return ResolvedTarget {
                    id,
                    resolution: Resolution::ViaImport,
                    scope: TargetScope::Imported,
                    used_checker: false,
                    import_depth: Some(found.depth),
                    is_exported,
                    ambiguous: false,
                    candidate_count: 1,
                };
            }
        }
        ResolvedTarget::placeholder(format!("external:{name}"))
    }

    // -- throws -----------------------------------------------------------

    pub(crate) fn emit_throw_edges(&mut self, tree: &Tree) {
        let mut sites = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "throw_statement" {
                if let Some(name) = self.thrown_type_name(node) {
                    sites.push((name, Range::from_node(&node)));
                }
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }

        for (name, site) in sites {
            if self.is_stop_name(&name) {
                continue;
            }
            let from = self.enclosing_entity_id(&site);
            // No checker rung for throws: local, imported, placeholder.
            let target = self.resolve_name(&name, CheckerContext::Reference, "class");
            let mut metadata = self.ladder_metadata(&target);
            metadata.set("kind", "throws");
            self.sink.push(EdgeDraft {
                from,
                kind: RelationKind::Throws,
                to: target.id.clone(),
                metadata,
                site: Some(site),
                used_checker: target.used_checker,
            });
        }
    }

    fn thrown_type_name(&self, throw_stmt: Node) -> Option<String> {
        let expr = throw_stmt.named_child(0)?;
        match expr.kind() {
            "new_expression" => {
                let ctor = expr.child_by_field_name("constructor")?;
                let root = super::calls::receiver_root(ctor)?;
                Some(self.text(&root).to_string())
            }
            "identifier" => Some(self.text(&expr).to_string()),
            _ => None,
        }
    }

    // -- RETURNS_TYPE / PARAM_TYPE / DEPENDS_ON ---------------------------

    pub(crate) fn emit_signature_edges(&mut self, tree: &Tree) {
        struct FunctionInfo {
            id: String,
            range: Range,
            params: Vec<(String, String)>,
            return_type: Option<String>,
        }
        let mut functions = Vec::new();
        for symbol in self.symbols {
            if let SymbolDetail::Function {
                parameters,
                return_type,
                ..
            } = &symbol.detail
            {
                functions.push(FunctionInfo {
                    id: symbol.id.clone(),
                    range: symbol.range,
                    params: parameters
                        .iter()
                        .filter_map(|p| {
                            p.type_text
                                .as_ref()
                                .map(|t| (p.name.clone(), t.clone()))
                        })
                        .collect(),
                    return_type: return_type.clone(),
                });
            }
        }

        for function in functions {
            for (param_name, type_text) in &function.params {
                let Some(type_name) = base_type_name(type_text) else {
                    continue;
                };
                if self.is_stop_name(&type_name) {
                    continue;
                }
                let target = self.resolve_name(&type_name, CheckerContext::Reference, "external");

                let mut metadata = self.ladder_metadata(&target);
                metadata.set("param", param_name.as_str());
                self.sink.push(EdgeDraft {
                    from: function.id.clone(),
                    kind: RelationKind::ParamType,
                    to: target.id.clone(),
                    metadata,
                    site: None,
                    used_checker: target.used_checker,
                });

                let mut dep_metadata = Metadata::new();
                dep_metadata.set("param", param_name.as_str());
                dep_metadata.set("scope", target.scope.as_str());
                dep_metadata.set("confidence", dependency_confidence(target.scope) as f64);
                dep_metadata.set("inferred", true);
                self.sink.push(EdgeDraft {
                    from: function.id.clone(),
                    kind: RelationKind::DependsOn,
                    to: target.id.clone(),
                    metadata: dep_metadata,
                    site: None,
                    used_checker: target.used_checker,
                });
            }

            match &function.return_type {
                Some(annotation) => {
                    let Some(type_name) = base_type_name(annotation) else {
                        continue;
                    };
                    if self.is_stop_name(&type_name) {
                        continue;
                    }
                    let target = self.resolve_name(&type_name, CheckerContext::Call, "external");
                    let metadata = self.ladder_metadata(&target);
                    self.sink.push(EdgeDraft {
                        from: function.id.clone(),
                        kind: RelationKind::ReturnsType,
                        to: target.id.clone(),
                        metadata,
                        site: None,
                        used_checker: target.used_checker,
                    });
                }
                None => {
                    self.infer_return_type_edge(tree, &function.id, &function.range);
                }
            }
        }
    }

    /// Annotation-free functions get one budgeted inference attempt: a body
    /// that returns `new X(…)` types as X.
    fn infer_return_type_edge(&mut self, tree: &Tree, function_id: &str, range: &Range) {
        let hints = ContextHints {
            imported: false,
            ambiguous: true,
            name_length: 0,
        };
        if self.oracle.is_none()
            || !self
                .budget
                .should_use_type_checker(CheckerContext::Call, hints)
            || !self.budget.take_budget()
        {
            return;
        }
        let Some(type_name) = self.returned_constructor_name(tree, range) else {
            return;
        };
        let Some(stripped) = base_type_name(&type_name) else {
            return;
        };
        let target = self.resolve_name(&stripped, CheckerContext::Call, "external");
        let mut metadata = self.ladder_metadata(&target);
        metadata.set("usedTypeChecker", true);
        metadata.set("inferredReturn", stripped.as_str());
        self.sink.push(EdgeDraft {
            from: function_id.to_string(),
            kind: RelationKind::ReturnsType,
            to: target.id.clone(),
            metadata,
            site: None,
            used_checker: true,
        });
    }

    fn returned_constructor_name(&self, tree: &Tree, range: &Range) -> Option<String> {
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "return_statement" {
                let site = Range::from_node(&node);
                if range.encloses(&site) {
                    if let Some(value) = node.named_child(0) {
                        if value.kind() == "new_expression" {
                            if let Some(ctor) = value.child_by_field_name("constructor") {
                                return Some(self.text(&ctor).to_string());
                            }
                        }
                    }
                }
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        None
    }
}

/// Heritage clauses can name qualified or generic expressions; edges target
/// the base identifier.
fn simple_heritage_name(raw: &str) -> String {
    let no_generics = raw.split('<').next().unwrap_or(raw);
    no_generics
        .rsplit('.')
        .next()
        .unwrap_or(no_generics)
        .trim()
        .to_string()
}

/// Declaring file behind a resolved heritage target, whether concrete or
/// placeholder.
fn declaring_file_of(target_id: &str) -> Option<String> {
    if let Some(rest) = target_id.strip_prefix("file:") {
        let (file, _) = rest.rsplit_once(':')?;
        return Some(file.to_string());
    }
    match parse_entity_id(target_id) {
        Some(EntityRef::Symbol { rel_path, .. }) => Some(rel_path),
        _ => None,
    }
}
