//! Parser core facade.
//!
//! Owns the lifetime of the cache, the checker budget, and the oracle for a
//! sequence of scans, and exposes the public entry points: `parse`,
//! `parse_file`, `parse_directory`, and `remove_file`. The facade never
//! throws across this boundary; every failure surfaces as a diagnostic in
//! the returned `ParseOutcome`.

use crate::budget::{BudgetStats, TypeCheckerBudget};
use crate::cache::{CacheManager, CacheStats};
use crate::config::Settings;
use crate::directories::directory_stream;
use crate::entity::Entity;
use crate::host::{FileSystem, OsFileSystem};
use crate::incremental::{CancelToken, IncrementalParser, ScanOutput};
use crate::parsing::Language;
use crate::relationship::Relationship;
use crate::resolver::{ProjectOracle, TypeOracle};
use crate::types::Diagnostic;
use crate::utils::normalize_path;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Inputs to one scan.
#[derive(Debug, Default)]
pub struct ParseRequest {
    /// Files to scan, in caller order.
    pub files: Vec<String>,
    /// Directories to expand (path-sorted) and scan after `files`.
    pub directories: Vec<String>,
    /// When false the cache is dropped first, forcing a full re-parse.
    pub incremental: bool,
    pub cancel: Option<CancelToken>,
}

impl ParseRequest {
    pub fn files<I: IntoIterator<Item = S>, S: Into<String>>(paths: I) -> Self {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
            incremental: true,
            ..Default::default()
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            directories: vec![path.into()],
            incremental: true,
            ..Default::default()
        }
    }
}

/// Everything one scan produced.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
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

impl ParseOutcome {
    fn from_scan(scan: ScanOutput) -> Self {
        Self {
            entities: scan.entities,
            relationships: scan.relationships,
            errors: scan.errors,
            is_incremental: scan.is_incremental,
            added_entities: scan.added_entities,
            removed_entities: scan.removed_entities,
            updated_entities: scan.updated_entities,
            added_relationships: scan.added_relationships,
            removed_relationships: scan.removed_relationships,
        }
    }
}

/// The parser core. One instance owns scan-scoped mutable state (cache,
/// indexes, budget); a long-running host must drop or clear it when the
/// underlying tree changes outside the core's view.
pub struct ParserCore {
    settings: Settings,
    root: PathBuf,
    fs: Box<dyn FileSystem>,
    oracle: Option<Box<dyn TypeOracle>>,
    cache: CacheManager,
    budget: TypeCheckerBudget,
}

impl ParserCore {
    pub fn new(root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self::with_file_system(root, settings, Box::new(OsFileSystem))
    }

    pub fn with_file_system(
        root: impl Into<PathBuf>,
        settings: Settings,
        fs: Box<dyn FileSystem>,
    ) -> Self {
        let budget = TypeCheckerBudget::new(settings.parser.type_checker_budget);
        Self {
            settings,
            root: root.into(),
            fs,
            oracle: Some(Box::new(ProjectOracle::new())),
            cache: CacheManager::new(),
            budget,
        }
    }

    /// Drop the type oracle; resolution degrades to the AST-only ladder.
    pub fn without_oracle(mut self) -> Self {
        self.oracle = None;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn budget_stats(&self) -> BudgetStats {
        self.budget.stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Run one scan.
    pub fn parse(&mut self, request: ParseRequest) -> ParseOutcome {
        let now = Utc::now();
        self.budget.reset();
        if !request.incremental {
            self.cache.clear();
        }

        let mut rel_paths: Vec<String> =
            request.files.iter().map(|p| self.relativize(p)).collect();
        for dir in &request.directories {
            rel_paths.extend(self.discover(&self.relativize(dir)));
        }

        let cancel = request.cancel.unwrap_or_default();
        let parser = IncrementalParser::new(
            self.fs.as_ref(),
            &self.root,
            &self.settings.parser,
            self.oracle.as_deref(),
        );
        let scan = parser.run(&rel_paths, &mut self.cache, &mut self.budget, &cancel, now);
        let mut outcome = ParseOutcome::from_scan(scan);

        // Directory entities and the CONTAINS forest are derived from the
        // file paths seen this scan.
        let file_paths: Vec<String> = outcome
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::File(f) => Some(f.path.clone()),
                _ => None,
            })
            .collect();
        let (dir_entities, dir_edges) = directory_stream(&file_paths, now);
        outcome.entities.extend(dir_entities);
        outcome.relationships.extend(dir_edges);

        tracing::debug!(
            "scan complete: {} entities, {} relationships, {} errors, budget {:?}",
            outcome.entities.len(),
            outcome.relationships.len(),
            outcome.errors.len(),
            self.budget.stats()
        );
        outcome
    }

    /// Parse a single file.
    pub fn parse_file(&mut self, path: impl Into<String>) -> ParseOutcome {
        self.parse(ParseRequest::files([path.into()]))
    }

    /// Parse every supported file under a directory.
    pub fn parse_directory(&mut self, path: impl Into<String>) -> ParseOutcome {
        self.parse(ParseRequest::directory(path))
    }

    /// Explicitly remove a file from the graph. Returns the entity and
    /// relationship ids that disappear with it.
    pub fn remove_file(&mut self, path: &str) -> (Vec<String>, Vec<String>) {
        let rel = self.relativize(path);
        match self.cache.remove(&rel) {
            Some(entry) => {
                let mut entity_ids: Vec<String> = entry
                    .entities
                    .iter()
                    .map(|e| e.id().to_string())
                    .collect();
                let mut relationship_ids: Vec<String> =
                    entry.relationships.iter().map(|r| r.id.clone()).collect();
                entity_ids.sort();
                relationship_ids.sort();
                (entity_ids, relationship_ids)
            }
            None => (Vec::new(), Vec::new()),
        }
    }

    fn relativize(&self, path: &str) -> String {
        let normalized = normalize_path(path);
        let as_path = Path::new(&normalized);
        if let Ok(stripped) = as_path.strip_prefix(&self.root) {
            return normalize_path(&stripped.to_string_lossy());
        }
        normalized
            .trim_start_matches("./")
            .to_string()
    }

    /// Expand a directory to its supported files, path-sorted for
    /// deterministic scan order. Real directories honor gitignore and the
    /// configured ignore patterns; virtual file systems fall back to a
    /// recursive listing.
    fn discover(&self, dir_rel: &str) -> Vec<String> {
        let abs = self.root.join(dir_rel);
        let mut found = if abs.is_dir() {
            self.discover_on_disk(&abs)
        } else {
            self.discover_virtual(dir_rel)
        };
        found.sort();
        found.dedup();
        found
    }

    fn discover_on_disk(&self, abs: &Path) -> Vec<String> {
        let mut builder = ignore::WalkBuilder::new(abs);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false);

        let mut override_builder = ignore::overrides::OverrideBuilder::new(abs);
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!("invalid ignore pattern '{pattern}': {e}");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|entry| Language::from_path(entry.path()).is_parseable())
            .map(|entry| self.relativize(&entry.path().to_string_lossy()))
            .collect()
    }

    fn discover_virtual(&self, dir_rel: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![dir_rel.to_string()];
        while let Some(dir) = stack.pop() {
            let abs = self.root.join(&dir);
            let Ok(names) = self.fs.list_dir(&abs) else {
                continue;
            };
            for name in names {
                let child = if dir == "." || dir.is_empty() {
                    name.clone()
                } else {
                    format!("{dir}/{name}")
                };
                let child_abs = self.root.join(&child);
                match self.fs.stat(&child_abs) {
                    Ok(stat) if stat.is_dir => stack.push(child),
                    Ok(stat) if stat.is_file => {
                        if Language::from_path(Path::new(&child)).is_parseable() {
                            out.push(child);
                        }
                    }
                    _ => {}
                }
            }
        }
        out
    }
}
