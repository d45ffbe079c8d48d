//! Per-file parse cache and global symbol indexes.
//!
//! The cache maps each scanned file to its last parse
//! (`{contentHash, entities, relationships, symbolMap}`), and maintains two
//! auxiliary indexes updated transactionally whenever an entry is added or
//! replaced:
//!
//! - `globalSymbolIndex`: `"<relPath>:<name>"` → symbol (last definition wins)
//! - `nameIndex`: name → symbols (insertion order preserved, duplicates allowed)
//!
//! Export maps computed by the module resolver are memoized here as well,
//! keyed by `(filePath, depth)`, and invalidated whenever a file on the
//! chain is rehashed.

use crate::entity::{Entity, SymbolEntity};
use crate::relationship::Relationship;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One entry in a module's effective export map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTarget {
    /// Declaring file, repository-relative.
    pub file: String,
    /// Name under which the declaring file exports the symbol.
    pub original_name: String,
    /// Re-export chain depth: 1 for a direct export, higher through barrels.
    pub depth: usize,
}

/// Effective export map of a module: exported name → declaring target.
pub type ExportMap = IndexMap<String, ExportTarget>;

#[derive(Debug, Clone)]
struct CachedExportMap {
    map: ExportMap,
    /// Every file visited while computing the map; a rehash of any of them
    /// invalidates this entry.
    chain: HashSet<String>,
}

/// Cached result of one file's parse.
#[derive(Debug, Clone)]
pub struct FileCacheEntry {
    pub rel_path: String,
    pub content_hash: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    /// `"<relPath>:<name>"` → symbol, for fast local lookup.
    pub symbol_map: HashMap<String, SymbolEntity>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub files: usize,
    pub symbols: usize,
    pub names: usize,
    pub export_maps: usize,
}

#[derive(Debug, Default)]
pub struct CacheManager {
    entries: HashMap<String, FileCacheEntry>,
    global_symbol_index: HashMap<String, SymbolEntity>,
    name_index: IndexMap<String, Vec<SymbolEntity>>,
    export_maps: HashMap<(String, usize), CachedExportMap>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileCacheEntry> {
        self.entries.get(path)
    }

    /// Insert or replace a file's entry, keeping the global indexes in
    /// step: the previous entry's symbols are purged first, then the new
    /// ones registered.
    pub fn set(&mut self, path: &str, entry: FileCacheEntry) {
        self.remove(path);
        for symbol in entry.symbol_map.values() {
            self.global_symbol_index
                .insert(symbol.index_key(), symbol.clone());
            self.name_index
                .entry(symbol.name.clone())
                .or_default()
                .push(symbol.clone());
        }
        self.entries.insert(path.to_string(), entry);
    }

    /// Remove a file's entry and purge its symbols from the indexes.
    /// Idempotent: removing an absent path is a no-op.
    pub fn remove(&mut self, path: &str) -> Option<FileCacheEntry> {
        let entry = self.entries.remove(path)?;
        let rel = entry.rel_path.clone();
        self.global_symbol_index
            .retain(|_, symbol| symbol.path != rel);
        for symbols in self.name_index.values_mut() {
            symbols.retain(|s| s.path != rel);
        }
        self.name_index.retain(|_, symbols| !symbols.is_empty());
        self.invalidate_export_maps_for(&rel);
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.global_symbol_index.clear();
        self.name_index.clear();
        self.export_maps.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            files: self.entries.len(),
            symbols: self.global_symbol_index.len(),
            names: self.name_index.len(),
            export_maps: self.export_maps.len(),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Look up a symbol by its `"<relPath>:<name>"` key.
    pub fn lookup_symbol(&self, rel_path: &str, name: &str) -> Option<&SymbolEntity> {
        self.global_symbol_index
            .get(&format!("{rel_path}:{name}"))
    }

    /// All known symbols with the given short name, in registration order.
    pub fn lookup_by_name(&self, name: &str) -> &[SymbolEntity] {
        self.name_index
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // -- export map memoization -------------------------------------------

    pub fn get_export_map(&self, rel_path: &str, depth: usize) -> Option<&ExportMap> {
        self.export_maps
            .get(&(rel_path.to_string(), depth))
            .map(|cached| &cached.map)
    }

    /// Cached export map together with the file chain it was computed
    /// from, so callers can propagate transitive invalidation sets.
    pub fn get_export_map_with_chain(
        &self,
        rel_path: &str,
        depth: usize,
    ) -> Option<(&ExportMap, &HashSet<String>)> {
        self.export_maps
            .get(&(rel_path.to_string(), depth))
            .map(|cached| (&cached.map, &cached.chain))
    }

    pub fn put_export_map(
        &mut self,
        rel_path: &str,
        depth: usize,
        map: ExportMap,
        chain: HashSet<String>,
    ) {
        self.export_maps
            .insert((rel_path.to_string(), depth), CachedExportMap { map, chain });
    }

    /// Drop every cached export map whose chain visited `rel_path`.
    pub fn invalidate_export_maps_for(&mut self, rel_path: &str) {
        self.export_maps
            .retain(|(owner, _), cached| owner != rel_path && !cached.chain.contains(rel_path));
    }
}
