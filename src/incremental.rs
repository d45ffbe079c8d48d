//! Incremental scan orchestration.
//!
//! Each path is probed against the cache by content hash: hits replay the
//! cached entities and relationships untouched, misses invalidate the stale
//! entry (including export maps whose chains crossed it) and run the full
//! extract → resolve → relate pipeline. After all paths are processed the
//! change sets are computed by diffing entity and relationship id sets
//! against the pre-scan cache snapshot.

use crate::budget::TypeCheckerBudget;
use crate::cache::{CacheManager, FileCacheEntry};
use crate::config::ParserConfig;
use crate::entity::Entity;
use crate::error::ExtractError;
use crate::host::FileSystem;
use crate::parsing::{Language, SourceParser, SymbolExtractor, scan_imports};
use crate::relationship::Relationship;
use crate::relationships::RelationshipBuilder;
use crate::resolver::{ModuleResolver, TypeOracle};
use crate::types::{Diagnostic, Severity};
use crate::utils::hash_content;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal. The scan finishes the current file,
/// keeps the cache consistent, and returns a partial result carrying a
/// `cancelled` diagnostic.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw output of one scan, before the facade attaches the directory stream.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub errors: Vec<Diagnostic>,
    pub is_incremental: bool,
    pub added_entities: Vec<String>,
    pub removed_entities: Vec<String>,
    pub updated_entities: Vec<String>,
    pub added_relationships: Vec<String>,
    pub removed_relationships: Vec<String>,
}

pub struct IncrementalParser<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    config: &'a ParserConfig,
    oracle: Option<&'a dyn TypeOracle>,
}

impl<'a> IncrementalParser<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        root: &'a Path,
        config: &'a ParserConfig,
        oracle: Option<&'a dyn TypeOracle>,
    ) -> Self {
        Self {
            fs,
            root,
            config,
            oracle,
        }
    }

    /// Process paths in the given (deterministic) order.
    pub fn run(
        &self,
        rel_paths: &[String],
        cache: &mut CacheManager,
        budget: &mut TypeCheckerBudget,
        cancel: &CancelToken,
        now: DateTime<Utc>,
    ) -> ScanOutput {
        let mut output = ScanOutput::default();
        let (pre_entities, pre_relationships) = snapshot(cache);

        let mut seen = HashSet::new();
        let mut hits = 0usize;

        for rel in rel_paths {
            if !seen.insert(rel.clone()) {
                continue;
            }
            if cancel.is_cancelled() {
                output
                    .errors
                    .push(Diagnostic::error(rel.clone(), "cancelled"));
                break;
            }

            let abs = self.root.join(rel);
            let code = match self.fs.read_file(&abs) {
                Ok(code) => code,
                Err(err) => {
                    if cache.has(rel) {
                        // A previously indexed file that vanished is a
                        // removal; the diff below reports its old ids.
                        cache.remove(rel);
                    }
                    output.errors.push(Diagnostic::error(
                        rel.clone(),
                        format!("failed to read file: {err}"),
                    ));
                    continue;
                }
            };

            let hash = hash_content(&code);
            if let Some(entry) = cache.get(rel) {
                if entry.content_hash == hash {
                    output.entities.extend(entry.entities.iter().cloned());
                    output
                        .relationships
                        .extend(entry.relationships.iter().cloned());
                    hits += 1;
                    continue;
                }
            }
            cache.remove(rel);

            let pass = catch_unwind(AssertUnwindSafe(|| {
                self.parse_file(rel, &code, &hash, cache, budget, now)
            }));
            match pass {
                Ok(Ok((entry, mut diagnostics))) => {
                    output.entities.extend(entry.entities.iter().cloned());
                    output
                        .relationships
                        .extend(entry.relationships.iter().cloned());
                    output.errors.append(&mut diagnostics);
                    cache.set(rel, entry);
                }
                Ok(Err(err)) => {
                    let severity = match &err {
                        ExtractError::UnsupportedFileType { .. } => Severity::Warning,
                        _ => Severity::Error,
                    };
                    output.errors.push(Diagnostic {
                        file: rel.clone(),
                        line: 0,
                        column: 0,
                        message: err.to_string(),
                        severity,
                    });
                }
                Err(_) => {
                    tracing::warn!("internal panic while parsing '{rel}', file skipped");
                    output.errors.push(Diagnostic::warning(
                        rel.clone(),
                        "internal error during parse, file skipped",
                    ));
                }
            }
        }

        output.is_incremental = hits > 0;

        let (post_entities, post_relationships) = snapshot(cache);
        for (id, hash) in &post_entities {
            match pre_entities.get(id) {
                None => output.added_entities.push(id.clone()),
                Some(old_hash) if old_hash != hash => output.updated_entities.push(id.clone()),
                Some(_) => {}
            }
        }
        for id in pre_entities.keys() {
            if !post_entities.contains_key(id) {
                output.removed_entities.push(id.clone());
            }
        }
        for id in &post_relationships {
            if !pre_relationships.contains(id) {
                output.added_relationships.push(id.clone());
            }
        }
        for id in &pre_relationships {
            if !post_relationships.contains(id) {
                output.removed_relationships.push(id.clone());
            }
        }
        output.added_entities.sort();
        output.removed_entities.sort();
        output.updated_entities.sort();
        output.added_relationships.sort();
        output.removed_relationships.sort();

        output
    }

    /// Full pipeline for one changed file.
    fn parse_file(
        &self,
        rel: &str,
        code: &str,
        hash: &str,
        cache: &mut CacheManager,
        budget: &mut TypeCheckerBudget,
        now: DateTime<Utc>,
    ) -> Result<(FileCacheEntry, Vec<Diagnostic>), ExtractError> {
        let language = Language::from_path(Path::new(rel));
        if !language.is_parseable() {
            return Err(ExtractError::UnsupportedFileType {
                path: rel.into(),
                extension: rel.rsplit('.').next().unwrap_or("").to_string(),
            });
        }

        let mut parser = SourceParser::new(language)?;
        let (tree, mut diagnostics) = parser.parse(code, rel)?;

        let extracted =
            SymbolExtractor::new(code, rel, language, hash, now).extract(&tree);

        // A file whose tree failed to parse cleanly still contributes its
        // File entity, but no symbols and no edges: half-extracted edges
        // would poison downstream diffs.
        if tree.root_node().has_error() {
            if let Some(first) = diagnostics.first_mut() {
                first.severity = Severity::Error;
            } else {
                diagnostics.push(Diagnostic::error(rel, "syntax error"));
            }
            let entry = FileCacheEntry {
                rel_path: rel.to_string(),
                content_hash: hash.to_string(),
                entities: vec![Entity::File(extracted.file)],
                relationships: Vec::new(),
                symbol_map: HashMap::new(),
                last_modified: now,
            };
            return Ok((entry, diagnostics));
        }

        let bindings = scan_imports(&tree, code);
        let resolver = ModuleResolver::new(self.fs, self.root, self.config);
        let imports = resolver.file_imports(&bindings, rel);

        let builder = RelationshipBuilder::new(
            code,
            rel,
            &extracted.symbols,
            &bindings,
            &imports,
            &extracted.variable_types,
            &resolver,
            cache,
            self.oracle,
            budget,
            self.config,
        );
        let relationships = builder.build(&tree, now);

        let mut symbol_map = HashMap::with_capacity(extracted.symbols.len());
        for symbol in &extracted.symbols {
            symbol_map.insert(symbol.index_key(), symbol.clone());
        }
        let mut entities = Vec::with_capacity(1 + extracted.symbols.len());
        entities.push(Entity::File(extracted.file));
        entities.extend(extracted.symbols.into_iter().map(Entity::Symbol));

        let entry = FileCacheEntry {
            rel_path: rel.to_string(),
            content_hash: hash.to_string(),
            entities,
            relationships,
            symbol_map,
            last_modified: now,
        };
        Ok((entry, diagnostics))
    }
}

/// Entity id → content hash, and the relationship id set, across the whole
/// cache.
fn snapshot(cache: &CacheManager) -> (HashMap<String, Option<String>>, HashSet<String>) {
    let mut entities = HashMap::new();
    let mut relationships = HashSet::new();
    let paths: Vec<String> = cache.paths().cloned().collect();
    for path in paths {
        if let Some(entry) = cache.get(&path) {
            for entity in &entry.entities {
                entities.insert(
                    entity.id().to_string(),
                    entity.hash().map(|h| h.to_string()),
                );
            }
            for relationship in &entry.relationships {
                relationships.insert(relationship.id.clone());
            }
        }
    }
    (entities, relationships)
}
