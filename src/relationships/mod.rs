//! Relationship extraction: typed edges with confidence scoring.
//!
//! The builder processes one file at a time. References resolve through a
//! four-tier ladder — local index, imported deep resolution, budgeted type
//! oracle, placeholder — short-circuiting at the first hit. Aggregated kinds
//! (CALLS, REFERENCES, READS, WRITES) collapse multiple sites per
//! `(from, to)` pair into one record carrying `occurrencesScan` and the
//! earliest site's location. Inferred edges below the confidence gate are
//! dropped, not persisted.

mod calls;
mod dataflow;
mod heritage;

use crate::budget::{CheckerContext, ContextHints, TypeCheckerBudget};
use crate::cache::CacheManager;
use crate::config::ParserConfig;
use crate::entity::{SymbolEntity, file_entity_id};
use crate::parsing::{ImportBinding, ImportKind, node_text};
use crate::relationship::{
    Metadata, RelationKind, Relationship, Resolution, TargetScope,
};
use crate::resolver::{FileImports, ModuleResolver, TypeOracle};
use crate::types::Range;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tree_sitter::{Node, Tree};

/// Method names treated as mutations of their receiver.
pub const MUTATOR_METHODS: &[&str] = &[
    "push",
    "pop",
    "shift",
    "unshift",
    "splice",
    "sort",
    "reverse",
    "copyWithin",
    "fill",
    "set",
    "delete",
    "clear",
    "add",
];

/// A ladder answer: target id (concrete or placeholder) plus how we got
/// there.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub id: String,
    pub resolution: Resolution,
    pub scope: TargetScope,
    pub used_checker: bool,
    pub import_depth: Option<usize>,
    pub is_exported: bool,
    pub ambiguous: bool,
    pub candidate_count: usize,
}

impl ResolvedTarget {
    fn placeholder(id: String) -> Self {
        Self {
            id,
            resolution: Resolution::Heuristic,
            scope: TargetScope::External,
            used_checker: false,
            import_depth: None,
            is_exported: false,
            ambiguous: false,
            candidate_count: 0,
        }
    }
}

/// One edge on its way into the sink.
#[derive(Debug)]
pub struct EdgeDraft {
    pub from: String,
    pub kind: RelationKind,
    pub to: String,
    pub metadata: Metadata,
    /// Syntactic site; aggregated kinds keep the earliest one.
    pub site: Option<Range>,
    pub used_checker: bool,
}

#[derive(Debug)]
struct AggregatedEdge {
    metadata: Metadata,
    site: Option<Range>,
    occurrences: u64,
}

/// Deduplicating, aggregating edge sink with the confidence gate.
#[derive(Debug, Default)]
pub struct EdgeSink {
    aggregated: indexmap::IndexMap<(RelationKind, String, String), AggregatedEdge>,
    plain: indexmap::IndexMap<(String, RelationKind, String), (Metadata, Option<Range>)>,
    min_confidence: f32,
}

impl EdgeSink {
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence,
            ..Default::default()
        }
    }

    pub fn push(&mut self, mut draft: EdgeDraft) {
        // Confidence gate: inferred edges below the threshold are dropped.
        if draft.metadata.get_bool("inferred").unwrap_or(false) {
            let confidence = draft.metadata.get_f64("confidence").unwrap_or(0.0) as f32;
            if confidence < self.min_confidence {
                tracing::debug!(
                    "dropping {} {} -> {} (confidence {confidence:.2} below gate)",
                    draft.kind,
                    draft.from,
                    draft.to
                );
                return;
            }
        }
        if !draft.metadata.contains("source") {
            draft.metadata.set(
                "source",
                if draft.used_checker { "type-checker" } else { "ast" },
            );
        }

        if draft.kind.is_aggregated() {
            let key = (draft.kind, draft.from, draft.to);
            match self.aggregated.get_mut(&key) {
                Some(existing) => {
                    existing.occurrences += 1;
                    if let (Some(new_site), Some(old_site)) = (&draft.site, &existing.site) {
                        if new_site.starts_before(old_site) {
                            existing.site = draft.site;
                            existing.metadata = draft.metadata;
                        }
                    }
                }
                None => {
                    self.aggregated.insert(
                        key,
                        AggregatedEdge {
                            metadata: draft.metadata,
                            site: draft.site,
                            occurrences: 1,
                        },
                    );
                }
            }
        } else {
            let key = (draft.from, draft.kind, draft.to);
            self.plain
                .entry(key)
                .or_insert((draft.metadata, draft.site));
        }
    }

    /// Drain into normalized relationship records.
    pub fn finish(self, now: DateTime<Utc>) -> Vec<Relationship> {
        let mut out = Vec::with_capacity(self.aggregated.len() + self.plain.len());
        for ((kind, from, to), edge) in self.aggregated {
            let mut metadata = edge.metadata;
            metadata.set("occurrencesScan", edge.occurrences);
            if let Some(site) = edge.site {
                metadata.set("line", site.start_line);
                metadata.set("column", site.start_column);
            }
            out.push(Relationship::new(from, kind, to, now, metadata));
        }
        for ((from, kind, to), (mut metadata, site)) in self.plain {
            if let Some(site) = site {
                metadata.set("line", site.start_line);
                metadata.set("column", site.start_column);
            }
            out.push(Relationship::new(from, kind, to, now, metadata));
        }
        out
    }
}

/// Scoring for inferred edges. Monotone in the ladder: checker-based
/// resolutions score above import-map resolutions, which score above
/// name-index rewrites, which score above `external:` placeholders.
pub fn confidence_for(
    resolution: Resolution,
    scope: TargetScope,
    is_exported: bool,
    import_depth: Option<usize>,
) -> f32 {
    let base = match resolution {
        Resolution::Direct => 0.95,
        Resolution::TypeChecker => 0.85,
        Resolution::ViaImport => 0.70,
        Resolution::Heuristic => match scope {
            TargetScope::External => 0.50,
            _ => 0.55,
        },
    };
    let mut score: f32 = base;
    if is_exported {
        score += 0.05;
    }
    if let Some(depth) = import_depth {
        score -= 0.05 * depth.saturating_sub(1) as f32;
    }
    score.clamp(0.0, 1.0)
}

/// Scope-based confidence for PARAM_TYPE's DEPENDS_ON edges.
pub fn dependency_confidence(scope: TargetScope) -> f32 {
    match scope {
        TargetScope::Local => 0.9,
        TargetScope::Imported => 0.6,
        TargetScope::External | TargetScope::Unknown => 0.4,
    }
}

/// Per-file relationship builder.
pub struct RelationshipBuilder<'a> {
    pub(crate) code: &'a str,
    pub(crate) rel_path: &'a str,
    pub(crate) file_id: String,
    pub(crate) symbols: &'a [SymbolEntity],
    pub(crate) local_index: HashMap<&'a str, &'a SymbolEntity>,
    pub(crate) bindings: &'a [ImportBinding],
    pub(crate) imports: &'a FileImports,
    pub(crate) variable_types: &'a HashMap<String, String>,
    pub(crate) resolver: &'a ModuleResolver<'a>,
    pub(crate) cache: &'a mut CacheManager,
    pub(crate) oracle: Option<&'a dyn TypeOracle>,
    pub(crate) budget: &'a mut TypeCheckerBudget,
    pub(crate) config: &'a ParserConfig,
    pub(crate) sink: EdgeSink,
}

impl<'a> RelationshipBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: &'a str,
        rel_path: &'a str,
        symbols: &'a [SymbolEntity],
        bindings: &'a [ImportBinding],
        imports: &'a FileImports,
        variable_types: &'a HashMap<String, String>,
        resolver: &'a ModuleResolver<'a>,
        cache: &'a mut CacheManager,
        oracle: Option<&'a dyn TypeOracle>,
        budget: &'a mut TypeCheckerBudget,
        config: &'a ParserConfig,
    ) -> Self {
        let local_index = symbols
            .iter()
            .map(|s| (s.name.as_str(), s))
            .collect::<HashMap<_, _>>();
        Self {
            code,
            rel_path,
            file_id: file_entity_id(rel_path),
            symbols,
            local_index,
            bindings,
            imports,
            variable_types,
            resolver,
            cache,
            oracle,
            budget,
            config,
            sink: EdgeSink::new(config.min_inferred_confidence),
        }
    }

    /// Run every pass and drain the sink.
    pub fn build(mut self, tree: &Tree, now: DateTime<Utc>) -> Vec<Relationship> {
        self.emit_import_edges();
        self.emit_call_edges(tree);
        self.emit_heritage_edges();
        self.emit_decorator_edges(tree);
        self.emit_throw_edges(tree);
        self.emit_signature_edges(tree);
        self.emit_dataflow_edges(tree);
        self.sink.finish(now)
    }

    // -- §4.6.1 import edges ----------------------------------------------

    fn emit_import_edges(&mut self) {
        // Side-effect imports have no alias and appear once per statement;
        // aliased bindings emit one edge each.
        for binding in self.bindings {
            let resolved = self
                .resolver
                .resolve_specifier(&binding.module, self.rel_path);

            let mut metadata = Metadata::new();
            metadata.set("module", binding.module.as_str());
            if let Some(alias) = &binding.alias {
                metadata.set("alias", alias.as_str());
            }
            metadata.set("importKind", binding.kind.as_str());

            let mut depth = 1u64;
            let to = match binding.kind {
                ImportKind::SideEffect => match &resolved {
                    Some(file) => {
                        let stem = file_stem(file);
                        format!("file:{file}:{stem}")
                    }
                    None => format!("import:{}:*", binding.module),
                },
                ImportKind::Default => match &resolved {
                    Some(file) => format!("file:{file}:default"),
                    None => format!("import:{}:default", binding.module),
                },
                ImportKind::Namespace => match &resolved {
                    Some(file) => format!("file:{file}:*"),
                    None => format!("import:{}:*", binding.module),
                },
                ImportKind::Named => {
                    let alias = binding.alias.as_deref().unwrap_or_default();
                    let original = binding.imported.as_deref().unwrap_or(alias);
                    match self.resolver.resolve_imported_member(
                        alias,
                        original,
                        self.imports,
                        self.cache,
                    ) {
                        Some(target) => {
                            depth = target.depth as u64;
                            format!("file:{}:{}", target.file, target.original_name)
                        }
                        None => {
                            let name = binding.alias.as_deref().or(binding.imported.as_deref());
                            format!(
                                "import:{}:{}",
                                binding.module,
                                name.unwrap_or("*")
                            )
                        }
                    }
                }
            };
            metadata.set("importDepth", depth);

            self.sink.push(EdgeDraft {
                from: self.file_id.clone(),
                kind: RelationKind::Imports,
                to,
                metadata,
                site: Some(binding.range),
                used_checker: false,
            });
        }
    }

    // -- shared resolution machinery --------------------------------------

    /// The four-tier ladder for a simple name. `placeholder_prefix` selects
    /// the placeholder family when nothing resolves (`external`, `class`,
    /// `interface`).
    pub(crate) fn resolve_name(
        &mut self,
        name: &str,
        ctx: CheckerContext,
        placeholder_prefix: &str,
    ) -> ResolvedTarget {
        // 1. Local.
        if let Some(symbol) = self.local_index.get(name) {
            return ResolvedTarget {
                id: symbol.id.clone(),
                resolution: Resolution::Direct,
                scope: TargetScope::Local,
                used_checker: false,
                import_depth: None,
                is_exported: symbol.is_exported,
                ambiguous: false,
                candidate_count: 1,
            };
        }

        // 2. Imported alias, resolved deep through export maps.
        let imported = self.imports.import_map.contains_key(name);
        if imported {
            if let Some(target) =
                self.resolver
                    .resolve_imported_member(name, name, self.imports, self.cache)
            {
                // Placeholders for default imports point at the module's
                // default binding; concretization goes through the declared
                // name.
                let hint_is_default = self
                    .imports
                    .import_symbol_map
                    .get(name)
                    .is_some_and(|hint| hint == "default");
                let placeholder_name = if hint_is_default {
                    "default"
                } else {
                    target.original_name.as_str()
                };
                let (id, is_exported) =
                    match self.cache.lookup_symbol(&target.file, &target.original_name) {
                        Some(symbol) => (symbol.id.clone(), symbol.is_exported),
                        None => (format!("file:{}:{}", target.file, placeholder_name), true),
                    };
                return ResolvedTarget {
                    id,
                    resolution: Resolution::ViaImport,
                    scope: TargetScope::Imported,
                    used_checker: false,
                    import_depth: Some(target.depth),
                    is_exported,
                    ambiguous: false,
                    candidate_count: 1,
                };
            }
        }

        let candidate_count = self.cache.lookup_by_name(name).len();
        let ambiguous = candidate_count > 1;

        // 3. Budgeted type oracle.
        let hints = ContextHints {
            imported,
            ambiguous,
            name_length: name.len(),
        };
        if let Some(oracle) = self.oracle {
            if self.budget.should_use_type_checker(ctx, hints) && self.budget.take_budget() {
                let answer = if ctx == CheckerContext::Call {
                    oracle.call_target(name, self.rel_path, self.cache)
                } else {
                    oracle.symbol_for_name(name, self.rel_path, self.cache)
                };
                if let Some(res) = answer {
                    let (id, is_exported) = match self.cache.lookup_symbol(&res.file, &res.name) {
                        Some(symbol) => (symbol.id.clone(), symbol.is_exported),
                        None => (format!("file:{}:{}", res.file, res.name), false),
                    };
                    let scope = if res.file == self.rel_path {
                        TargetScope::Local
                    } else {
                        TargetScope::Imported
                    };
                    return ResolvedTarget {
                        id,
                        resolution: Resolution::TypeChecker,
                        scope,
                        used_checker: true,
                        import_depth: None,
                        is_exported,
                        ambiguous,
                        candidate_count,
                    };
                }
            }
        }

        // 4. Name-index concretization, then placeholder.
        let candidates = self.cache.lookup_by_name(name);
        if candidates.len() == 1 {
            let symbol = &candidates[0];
            return ResolvedTarget {
                id: symbol.id.clone(),
                resolution: Resolution::Heuristic,
                scope: TargetScope::Unknown,
                used_checker: false,
                import_depth: None,
                is_exported: symbol.is_exported,
                ambiguous: false,
                candidate_count: 1,
            };
        }
        if candidates.len() > 1 {
            let best = candidates
                .iter()
                .max_by_key(|c| crate::resolver::checker::shared_prefix_segments(&c.path, self.rel_path));
            if let Some(best) = best {
                if crate::resolver::checker::shared_prefix_segments(&best.path, self.rel_path) > 0 {
                    return ResolvedTarget {
                        id: best.id.clone(),
                        resolution: Resolution::Heuristic,
                        scope: TargetScope::Unknown,
                        used_checker: false,
                        import_depth: None,
                        is_exported: best.is_exported,
                        ambiguous: true,
                        candidate_count,
                    };
                }
            }
        }

        let mut target = ResolvedTarget::placeholder(format!("{placeholder_prefix}:{name}"));
        target.ambiguous = ambiguous;
        target.candidate_count = candidate_count;
        target
    }

    /// Innermost extracted symbol enclosing a site, or the file itself.
    pub(crate) fn enclosing_entity_id(&self, site: &Range) -> String {
        self.symbols
            .iter()
            .filter(|s| s.range.encloses(site))
            .min_by_key(|s| {
                (s.range.end_line - s.range.start_line, u32::MAX - s.range.start_line)
            })
            .map(|s| s.id.clone())
            .unwrap_or_else(|| self.file_id.clone())
    }

    pub(crate) fn is_stop_name(&self, name: &str) -> bool {
        self.config.is_stop_name(name)
    }

    pub(crate) fn text(&self, node: &Node) -> &'a str {
        node_text(node, self.code)
    }

    /// Standard metadata block shared by ladder-resolved edges.
    pub(crate) fn ladder_metadata(&self, target: &ResolvedTarget) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.set("resolution", target.resolution.as_str());
        metadata.set("scope", target.scope.as_str());
        let confidence = confidence_for(
            target.resolution,
            target.scope,
            target.is_exported,
            target.import_depth,
        );
        metadata.set("confidence", confidence as f64);
        if target.resolution != Resolution::Direct {
            metadata.set("inferred", true);
        }
        if target.used_checker {
            metadata.set("usedTypeChecker", true);
        }
        if let Some(depth) = target.import_depth {
            metadata.set("importDepth", depth as u64);
        }
        if target.ambiguous {
            metadata.set("ambiguous", true);
            metadata.set("candidateCount", target.candidate_count as u64);
        }
        metadata
    }
}

pub(crate) fn file_stem(rel_path: &str) -> &str {
    let base = rel_path.rsplit('/').next().unwrap_or(rel_path);
    base.split_once('.').map(|(stem, _)| stem).unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCacheEntry;
    use crate::host::MemoryFileSystem;
    use crate::parsing::{SourceParser, SymbolExtractor, scan_imports};
    use crate::resolver::ProjectOracle;
    use std::path::Path;

    /// Run the full per-file pipeline over one source string, with extra
    /// sibling files visible to the resolver and an optionally pre-seeded
    /// cache.
    fn build_edges(
        code: &str,
        siblings: &[(&str, &str)],
        budget_total: u32,
    ) -> (Vec<Relationship>, u32) {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/main.ts", code);
        for (path, content) in siblings {
            fs.add_file(*path, *content);
        }
        let config = ParserConfig::default();
        let mut cache = CacheManager::new();
        let mut budget = TypeCheckerBudget::new(budget_total);
        let oracle = ProjectOracle::new();
        let now = Utc::now();

        // Seed sibling symbols into the cache the way a prior file pass
        // would have.
        for (path, content) in siblings {
            let language = crate::parsing::Language::from_path(Path::new(path));
            let mut parser = SourceParser::new(language).unwrap();
            let (tree, _) = parser.parse(content, path).unwrap();
            let hash = crate::utils::hash_content(content);
            let extracted = SymbolExtractor::new(content, path, language, &hash, now).extract(&tree);
            let mut symbol_map = std::collections::HashMap::new();
            for symbol in &extracted.symbols {
                symbol_map.insert(symbol.index_key(), symbol.clone());
            }
            cache.set(
                path,
                FileCacheEntry {
                    rel_path: path.to_string(),
                    content_hash: hash,
                    entities: Vec::new(),
                    relationships: Vec::new(),
                    symbol_map,
                    last_modified: now,
                },
            );
        }

        let mut parser = SourceParser::new(crate::parsing::Language::TypeScript).unwrap();
        let (tree, _) = parser.parse(code, "src/main.ts").unwrap();
        let hash = crate::utils::hash_content(code);
        let extracted =
            SymbolExtractor::new(code, "src/main.ts", crate::parsing::Language::TypeScript, &hash, now)
                .extract(&tree);
        let bindings = scan_imports(&tree, code);
        let resolver = ModuleResolver::new(&fs, Path::new(""), &config);
        let imports = resolver.file_imports(&bindings, "src/main.ts");
        let builder = RelationshipBuilder::new(
            code,
            "src/main.ts",
            &extracted.symbols,
            &bindings,
            &imports,
            &extracted.variable_types,
            &resolver,
            &mut cache,
            Some(&oracle),
            &mut budget,
            &config,
        );
        let edges = builder.build(&tree, now);
        (edges, budget_total - budget.remaining())
    }

    #[test]
    fn test_ladder_prefers_local_over_sibling_definitions() {
        let (edges, _) = build_edges(
            "function helper(){}\nfunction f(){ helper(); }\n",
            &[("src/other.ts", "export function helper(){}\n")],
            100,
        );
        let call = edges
            .iter()
            .find(|e| e.kind == RelationKind::Calls)
            .expect("CALLS edge");
        assert!(call.to_entity_id.starts_with("sym:src/main.ts#helper@"));
        assert_eq!(call.metadata.get_str("resolution"), Some("direct"));
    }

    #[test]
    fn test_unique_name_index_candidate_is_concretized() {
        // Not imported, not local, but the project knows exactly one
        // `formatDate`: the heuristic rung rewrites the placeholder.
        let (edges, _) = build_edges(
            "function f(){ formatDate(); }\n",
            &[("src/dates.ts", "export function formatDate(){}\n")],
            0, // no budget, so the oracle rung cannot fire
        );
        let call = edges
            .iter()
            .find(|e| e.kind == RelationKind::Calls)
            .expect("CALLS edge");
        assert!(call.to_entity_id.starts_with("sym:src/dates.ts#formatDate@"));
        assert_eq!(call.metadata.get_str("resolution"), Some("heuristic"));
        assert_eq!(call.metadata.get_bool("inferred"), Some(true));
    }

    #[test]
    fn test_exhausted_budget_falls_through_to_placeholder() {
        // Heritage always wants the checker, but with zero budget the
        // ladder degrades to the AST-only rungs and never fails.
        let (edges, spent) = build_edges("class A extends Phantom {}\n", &[], 0);
        let extends = edges
            .iter()
            .find(|e| e.kind == RelationKind::Extends)
            .expect("EXTENDS edge");
        assert_eq!(extends.to_entity_id, "class:Phantom");
        assert_eq!(extends.metadata.get_bool("usedTypeChecker"), None);
        assert_eq!(spent, 0);
    }

    #[test]
    fn test_ambiguous_name_marks_candidates() {
        let (edges, _) = build_edges(
            "function f(){ throw new Conflict(); }\n",
            &[
                ("lib/a.ts", "export class Conflict {}\n"),
                ("vendor/b.ts", "export class Conflict {}\n"),
            ],
            0,
        );
        let throw_edge = edges
            .iter()
            .find(|e| e.kind == RelationKind::Throws)
            .expect("THROWS edge");
        // Neither candidate shares a path prefix with src/main.ts, so the
        // placeholder survives with ambiguity recorded.
        assert_eq!(throw_edge.to_entity_id, "class:Conflict");
        assert_eq!(throw_edge.metadata.get_bool("ambiguous"), Some(true));
        assert_eq!(throw_edge.metadata.get_u64("candidateCount"), Some(2));
    }

    #[test]
    fn test_import_depth_flows_into_call_metadata() {
        let (edges, _) = build_edges(
            "import { deep } from \"./barrel\";\nexport function f(){ deep(); }\n",
            &[
                ("src/impl.ts", "export function deep(){}\n"),
                ("src/barrel.ts", "export * from \"./impl\";\n"),
            ],
            100,
        );
        let call = edges
            .iter()
            .find(|e| e.kind == RelationKind::Calls)
            .expect("CALLS edge");
        assert_eq!(call.metadata.get_u64("importDepth"), Some(2));
        assert_eq!(call.metadata.get_str("scope"), Some("imported"));
        // The derived dependency inherits the call target.
        let dep = edges
            .iter()
            .find(|e| e.kind == RelationKind::DependsOn)
            .expect("DEPENDS_ON edge");
        assert_eq!(dep.to_entity_id, call.to_entity_id);
    }

    #[test]
    fn test_receiver_typed_method_call_uses_checker() {
        let (edges, spent) = build_edges(
            "import { Repo } from \"./repo\";\nconst store: Repo = new Repo();\nexport function f(){ store.find(); }\n",
            &[("src/repo.ts", "export class Repo {\n  find(): void {}\n}\n")],
            100,
        );
        let call = edges
            .iter()
            .find(|e| {
                e.kind == RelationKind::Calls && e.metadata.get_bool("isMethod") == Some(true)
            })
            .expect("method CALLS edge");
        assert!(
            call.to_entity_id.starts_with("sym:src/repo.ts#find@")
                || call.to_entity_id == "file:src/repo.ts:find",
            "unexpected target {}",
            call.to_entity_id
        );
        assert_eq!(call.metadata.get_str("resolution"), Some("type-checker"));
        assert!(spent > 0);
    }

    #[test]
    fn test_confidence_is_monotone_in_the_ladder() {
        let direct = confidence_for(Resolution::Direct, TargetScope::Local, false, None);
        let checker = confidence_for(Resolution::TypeChecker, TargetScope::Imported, false, None);
        let import = confidence_for(Resolution::ViaImport, TargetScope::Imported, false, None);
        let heuristic = confidence_for(Resolution::Heuristic, TargetScope::Unknown, false, None);
        let external = confidence_for(Resolution::Heuristic, TargetScope::External, false, None);
        assert!(direct > checker);
        assert!(checker > import);
        assert!(import > heuristic);
        assert!(heuristic > external);
        assert!((external - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_penalizes_reexport_depth() {
        let direct_import =
            confidence_for(Resolution::ViaImport, TargetScope::Imported, false, Some(1));
        let through_barrel =
            confidence_for(Resolution::ViaImport, TargetScope::Imported, false, Some(3));
        assert!(direct_import > through_barrel);
    }

    #[test]
    fn test_dependency_confidence_table() {
        assert!((dependency_confidence(TargetScope::Local) - 0.9).abs() < f32::EPSILON);
        assert!((dependency_confidence(TargetScope::Imported) - 0.6).abs() < f32::EPSILON);
        assert!((dependency_confidence(TargetScope::External) - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sink_aggregates_and_keeps_earliest_site() {
        let mut sink = EdgeSink::new(0.5);
        let mk = |line: u32| EdgeDraft {
            from: "sym:a.ts#f@00000000".to_string(),
            kind: RelationKind::Calls,
            to: "sym:a.ts#g@00000000".to_string(),
            metadata: Metadata::new(),
            site: Some(Range::new(line, 2, line, 8)),
            used_checker: false,
        };
        sink.push(mk(9));
        sink.push(mk(3));
        sink.push(mk(12));
        let edges = sink.finish(Utc::now());
        assert_eq!(edges.len(), 1);
        let edge = &edges[0];
        assert_eq!(edge.metadata.get_u64("occurrencesScan"), Some(3));
        assert_eq!(edge.metadata.get_u64("line"), Some(3));
    }

    #[test]
    fn test_sink_dedupes_non_aggregated_kinds() {
        let mut sink = EdgeSink::new(0.5);
        for _ in 0..2 {
            sink.push(EdgeDraft {
                from: "sym:a.ts#A@00000000".to_string(),
                kind: RelationKind::Extends,
                to: "class:Base".to_string(),
                metadata: Metadata::new(),
                site: None,
                used_checker: false,
            });
        }
        let edges = sink.finish(Utc::now());
        assert_eq!(edges.len(), 1);
        assert!(edges[0].metadata.get_u64("occurrencesScan").is_none());
    }

    #[test]
    fn test_sink_gates_low_confidence_inferred_edges() {
        let mut sink = EdgeSink::new(0.5);
        let mut low = Metadata::new();
        low.set("inferred", true);
        low.set("confidence", 0.4);
        sink.push(EdgeDraft {
            from: "sym:a.ts#f@00000000".to_string(),
            kind: RelationKind::DependsOn,
            to: "external:Opts".to_string(),
            metadata: low,
            site: None,
            used_checker: false,
        });
        let mut ok = Metadata::new();
        ok.set("inferred", true);
        ok.set("confidence", 0.5);
        sink.push(EdgeDraft {
            from: "sym:a.ts#f@00000000".to_string(),
            kind: RelationKind::Writes,
            to: "external:items".to_string(),
            metadata: ok,
            site: None,
            used_checker: false,
        });
        let edges = sink.finish(Utc::now());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationKind::Writes);
    }

    #[test]
    fn test_sink_normalizes_source() {
        let mut sink = EdgeSink::new(0.5);
        sink.push(EdgeDraft {
            from: "file:a.ts".to_string(),
            kind: RelationKind::Imports,
            to: "file:b.ts:default".to_string(),
            metadata: Metadata::new(),
            site: None,
            used_checker: false,
        });
        sink.push(EdgeDraft {
            from: "sym:a.ts#A@00000000".to_string(),
            kind: RelationKind::Extends,
            to: "file:b.ts:Base".to_string(),
            metadata: Metadata::new(),
            site: None,
            used_checker: true,
        });
        let edges = sink.finish(Utc::now());
        let import = edges.iter().find(|e| e.kind == RelationKind::Imports).unwrap();
        assert_eq!(import.metadata.get_str("source"), Some("ast"));
        let extends = edges.iter().find(|e| e.kind == RelationKind::Extends).unwrap();
        assert_eq!(extends.metadata.get_str("source"), Some("type-checker"));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("src/lib/helpers.ts"), "helpers");
        assert_eq!(file_stem("types.d.ts"), "types");
        assert_eq!(file_stem("Makefile"), "Makefile");
    }
}
