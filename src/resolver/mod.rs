//! Module specifier resolution and effective export maps.
//!
//! Answers two questions for the relationship builder: which source file
//! does a specifier in file F resolve to, and what names does that module
//! expose? Re-export chains (named, star, namespace) are followed to a
//! bounded depth with cycle breaking; results are memoized in the cache and
//! invalidated when any file on the chain is rehashed.

pub mod checker;

pub use checker::{OracleResolution, ProjectOracle, TypeOracle, base_type_name};

use crate::cache::{CacheManager, ExportMap, ExportTarget};
use crate::config::ParserConfig;
use crate::host::FileSystem;
use crate::parsing::{ExportItem, Language, SourceParser, scan_exports};
use crate::utils::{collapse_dots, normalize_path, parent_dir};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Per-file import maps handed to the relationship builder: where each
/// local alias came from, and under which name the exporting module knows
/// it.
#[derive(Debug, Default, Clone)]
pub struct FileImports {
    /// alias → resolved repository-relative path.
    pub import_map: HashMap<String, String>,
    /// alias → original exported name.
    pub import_symbol_map: HashMap<String, String>,
}

pub struct ModuleResolver<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    config: &'a ParserConfig,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, root: &'a Path, config: &'a ParserConfig) -> Self {
        Self { fs, root, config }
    }

    /// Resolve a module specifier appearing in `from_rel` to a
    /// repository-relative source file. Bare package specifiers resolve to
    /// nothing; a source file with an implementation extension is preferred
    /// over a declaration-only file with the same basename.
    pub fn resolve_specifier(&self, specifier: &str, from_rel: &str) -> Option<String> {
        let expanded = self.expand_alias(specifier);
        let base = if expanded.starts_with("./") || expanded.starts_with("../") {
            collapse_dots(&format!("{}/{}", parent_dir(from_rel), expanded))
        } else if expanded != specifier {
            // An alias expansion is rooted at the repository.
            collapse_dots(&expanded)
        } else {
            // Bare package specifier: external.
            return None;
        };

        for candidate in self.candidates(&base) {
            if self.fs.is_file(&self.abs(&candidate)) {
                return Some(normalize_path(&candidate));
            }
        }
        None
    }

    fn abs(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn expand_alias(&self, specifier: &str) -> String {
        // Longest pattern wins, ties broken lexically, so overlapping
        // aliases expand the same way on every scan.
        let mut patterns: Vec<(&String, &String)> = self.config.paths.iter().collect();
        patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        for (pattern, target) in patterns {
            if let Some(prefix) = pattern.strip_suffix('*') {
                if let Some(rest) = specifier.strip_prefix(prefix) {
                    return target.replace('*', rest);
                }
            } else if pattern == specifier {
                return target.clone();
            }
        }
        specifier.to_string()
    }

    fn candidates(&self, base: &str) -> Vec<String> {
        let mut out = Vec::new();
        // Exact path first when the specifier already carries an extension.
        if Language::from_path(Path::new(base)).is_parseable() {
            out.push(base.to_string());
        }
        for ext in crate::parsing::RESOLUTION_EXTENSIONS {
            out.push(format!("{base}.{ext}"));
        }
        for ext in crate::parsing::RESOLUTION_EXTENSIONS {
            out.push(format!("{base}/index.{ext}"));
        }
        out
    }

    /// Effective export map of `rel`: every name the module exposes, mapped
    /// to its declaring file and original name. Memoized per `(path, depth)`.
    pub fn export_map(&self, rel: &str, cache: &mut CacheManager) -> ExportMap {
        let mut seen = HashSet::new();
        let mut chain = HashSet::new();
        self.export_map_at(rel, 0, &mut seen, cache, &mut chain)
    }

    /// `chain_out` accumulates every file visited below this node, so each
    /// memoized entry records its transitive chain for invalidation.
    fn export_map_at(
        &self,
        rel: &str,
        depth: usize,
        seen: &mut HashSet<String>,
        cache: &mut CacheManager,
        chain_out: &mut HashSet<String>,
    ) -> ExportMap {
        if depth >= self.config.max_reexport_depth {
            tracing::debug!("re-export depth limit reached at '{rel}'");
            return ExportMap::new();
        }
        if let Some((map, cached_chain)) = cache.get_export_map_with_chain(rel, depth) {
            let map = map.clone();
            chain_out.extend(cached_chain.iter().cloned());
            return map;
        }
        if !seen.insert(rel.to_string()) {
            // Cycle on this chain; the other side resolves what it can.
            return ExportMap::new();
        }

        let mut map = ExportMap::new();
        let mut chain: HashSet<String> = HashSet::new();
        chain.insert(rel.to_string());

        let Some(items) = self.exports_of(rel) else {
            cache.put_export_map(rel, depth, map.clone(), chain.clone());
            seen.remove(rel);
            chain_out.extend(chain);
            return map;
        };

        // Direct exports and the default export register first; re-exports
        // never overwrite an already-registered name.
        for item in &items {
            match item {
                ExportItem::Direct { name } => {
                    map.entry(name.clone()).or_insert(ExportTarget {
                        file: rel.to_string(),
                        original_name: name.clone(),
                        depth: depth + 1,
                    });
                }
                ExportItem::Default { original } => {
                    map.entry("default".to_string()).or_insert(ExportTarget {
                        file: rel.to_string(),
                        original_name: original.clone().unwrap_or_else(|| "default".to_string()),
                        depth: depth + 1,
                    });
                }
                ExportItem::NamedLocal { name, alias } => {
                    let key = alias.clone().unwrap_or_else(|| name.clone());
                    map.entry(key).or_insert(ExportTarget {
                        file: rel.to_string(),
                        original_name: name.clone(),
                        depth: depth + 1,
                    });
                }
                _ => {}
            }
        }

        for item in &items {
            match item {
                ExportItem::NamedReexport {
                    name,
                    alias,
                    module,
                } => {
                    let Some(child) = self.resolve_specifier(module, rel) else {
                        continue;
                    };
                    chain.insert(child.clone());
                    let child_map = self.export_map_at(&child, depth + 1, seen, cache, &mut chain);
                    if let Some(target) = child_map.get(name) {
                        let key = alias.clone().unwrap_or_else(|| name.clone());
                        map.entry(key).or_insert(target.clone());
                    }
                }
                ExportItem::StarReexport { module } => {
                    let Some(child) = self.resolve_specifier(module, rel) else {
                        continue;
                    };
                    chain.insert(child.clone());
                    let child_map = self.export_map_at(&child, depth + 1, seen, cache, &mut chain);
                    for (name, target) in child_map {
                        if name == "default" {
                            continue;
                        }
                        map.entry(name).or_insert(target);
                    }
                }
                ExportItem::NamespaceReexport { alias, module } => {
                    let Some(child) = self.resolve_specifier(module, rel) else {
                        continue;
                    };
                    chain.insert(child.clone());
                    map.entry(alias.clone()).or_insert(ExportTarget {
                        file: child,
                        original_name: alias.clone(),
                        depth: depth + 1,
                    });
                }
                _ => {}
            }
        }

        cache.put_export_map(rel, depth, map.clone(), chain.clone());
        seen.remove(rel);
        chain_out.extend(chain);
        map
    }

    fn exports_of(&self, rel: &str) -> Option<Vec<ExportItem>> {
        let language = Language::from_path(Path::new(rel));
        if !language.is_parseable() {
            return None;
        }
        let code = self.fs.read_file(&self.abs(rel)).ok()?;
        let mut parser = SourceParser::new(language).ok()?;
        let (tree, _) = parser.parse(&code, rel).ok()?;
        Some(scan_exports(&tree, &code))
    }

    /// Build the alias maps for a file's import statements.
    pub fn file_imports(
        &self,
        bindings: &[crate::parsing::ImportBinding],
        from_rel: &str,
    ) -> FileImports {
        let mut imports = FileImports::default();
        for binding in bindings {
            let Some(alias) = &binding.alias else {
                continue;
            };
            if let Some(resolved) = self.resolve_specifier(&binding.module, from_rel) {
                imports.import_map.insert(alias.clone(), resolved);
            }
            if let Some(original) = &binding.imported {
                imports
                    .import_symbol_map
                    .insert(alias.clone(), original.clone());
            }
        }
        imports
    }

    /// Resolve a member reached through an imported alias to its declaring
    /// file and original name. Attempts, in order: the hint name recorded
    /// at the import site, the requested member, and `"default"` when the
    /// member is the default binding.
    pub fn resolve_imported_member(
        &self,
        alias: &str,
        member: &str,
        imports: &FileImports,
        cache: &mut CacheManager,
    ) -> Option<ExportTarget> {
        let file = imports.import_map.get(alias)?.clone();
        let map = self.export_map(&file, cache);

        if let Some(hint) = imports.import_symbol_map.get(alias) {
            if let Some(target) = map.get(hint) {
                return Some(target.clone());
            }
        }
        if let Some(target) = map.get(member) {
            return Some(target.clone());
        }
        if member == "default" {
            if let Some(target) = map.get("default") {
                return Some(target.clone());
            }
        }
        // The module exists but the name never surfaced through its export
        // map; fall back to the module file itself so the placeholder still
        // points at a known file.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFileSystem;

    fn config() -> ParserConfig {
        ParserConfig::default()
    }

    fn config_with_alias() -> ParserConfig {
        let mut cfg = ParserConfig::default();
        cfg.paths
            .insert("@app/*".to_string(), "src/app/*".to_string());
        cfg
    }

    #[test]
    fn test_resolve_relative_specifier() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/a.ts", "");
        fs.add_file("src/lib/b.ts", "");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);

        assert_eq!(
            resolver.resolve_specifier("./lib/b", "src/a.ts"),
            Some("src/lib/b.ts".to_string())
        );
        assert_eq!(
            resolver.resolve_specifier("../a", "src/lib/b.ts"),
            Some("src/a.ts".to_string())
        );
        assert_eq!(resolver.resolve_specifier("./missing", "src/a.ts"), None);
        // Bare package specifiers are external.
        assert_eq!(resolver.resolve_specifier("lodash", "src/a.ts"), None);
    }

    #[test]
    fn test_prefers_implementation_over_declaration() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/b.ts", "");
        fs.add_file("src/b.d.ts", "");
        fs.add_file("src/a.ts", "");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        assert_eq!(
            resolver.resolve_specifier("./b", "src/a.ts"),
            Some("src/b.ts".to_string())
        );
    }

    #[test]
    fn test_resolves_index_files() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/lib/index.ts", "");
        fs.add_file("src/a.ts", "");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        assert_eq!(
            resolver.resolve_specifier("./lib", "src/a.ts"),
            Some("src/lib/index.ts".to_string())
        );
    }

    #[test]
    fn test_path_alias_expansion() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/app/widgets/button.ts", "");
        fs.add_file("src/page.ts", "");
        let cfg = config_with_alias();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        assert_eq!(
            resolver.resolve_specifier("@app/widgets/button", "src/page.ts"),
            Some("src/app/widgets/button.ts".to_string())
        );
    }

    #[test]
    fn test_export_map_direct_and_default() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "src/b.ts",
            "export default function d() {}\nexport function x() {}\nconst y = 1;\nexport { y as z };\n",
        );
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map = resolver.export_map("src/b.ts", &mut cache);
        assert_eq!(map["default"].original_name, "d");
        assert_eq!(map["x"].file, "src/b.ts");
        assert_eq!(map["x"].depth, 1);
        assert_eq!(map["z"].original_name, "y");
        assert!(!map.contains_key("y"));
    }

    #[test]
    fn test_export_map_follows_star_chain() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/b.ts", "export function h() {}\nexport default function b() {}\n");
        fs.add_file("src/c.ts", "export * from \"./b\";\n");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map = resolver.export_map("src/c.ts", &mut cache);
        let h = &map["h"];
        assert_eq!(h.file, "src/b.ts");
        assert_eq!(h.original_name, "h");
        assert_eq!(h.depth, 2);
        // Star re-exports never forward the default binding.
        assert!(!map.contains_key("default"));
    }

    #[test]
    fn test_named_reexport_with_alias() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/b.ts", "export function original() {}\n");
        fs.add_file("src/c.ts", "export { original as renamed } from \"./b\";\n");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map = resolver.export_map("src/c.ts", &mut cache);
        assert_eq!(map["renamed"].file, "src/b.ts");
        assert_eq!(map["renamed"].original_name, "original");
        assert!(!map.contains_key("original"));
    }

    #[test]
    fn test_direct_export_wins_over_reexport() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/b.ts", "export function shared() {}\n");
        fs.add_file(
            "src/c.ts",
            "export * from \"./b\";\nexport function shared() {}\n",
        );
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map = resolver.export_map("src/c.ts", &mut cache);
        assert_eq!(map["shared"].file, "src/c.ts");
    }

    #[test]
    fn test_star_cycle_terminates() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/a.ts", "export * from \"./b\";\nexport function fa() {}\n");
        fs.add_file("src/b.ts", "export * from \"./a\";\nexport function fb() {}\n");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map_a = resolver.export_map("src/a.ts", &mut cache);
        assert_eq!(map_a["fa"].file, "src/a.ts");
        assert_eq!(map_a["fb"].file, "src/b.ts");
        let map_b = resolver.export_map("src/b.ts", &mut cache);
        assert!(map_b.contains_key("fa"));
    }

    #[test]
    fn test_depth_limit_truncates_chain() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/leaf.ts", "export function deep() {}\n");
        fs.add_file("src/l1.ts", "export * from \"./leaf\";\n");
        fs.add_file("src/l2.ts", "export * from \"./l1\";\n");
        fs.add_file("src/l3.ts", "export * from \"./l2\";\n");
        fs.add_file("src/l4.ts", "export * from \"./l3\";\n");
        let mut cfg = config();
        cfg.max_reexport_depth = 3;
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        // Within the limit the chain resolves…
        let map = resolver.export_map("src/l2.ts", &mut cache);
        assert!(map.contains_key("deep"));
        // …beyond it the walk returns a partial (empty) map, never throws.
        let map = resolver.export_map("src/l4.ts", &mut cache);
        assert!(!map.contains_key("deep"));
    }

    #[test]
    fn test_leaf_edit_invalidates_whole_chain_memo() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/leaf.ts", "export function deep() {}\n");
        fs.add_file("src/mid.ts", "export * from \"./leaf\";\n");
        fs.add_file("src/top.ts", "export * from \"./mid\";\n");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map = resolver.export_map("src/top.ts", &mut cache);
        assert!(map.contains_key("deep"));
        assert!(cache.get_export_map("src/top.ts", 0).is_some());

        // Rehashing the leaf drops the memo two levels up.
        cache.invalidate_export_maps_for("src/leaf.ts");
        assert!(cache.get_export_map("src/top.ts", 0).is_none());
        assert!(cache.get_export_map("src/mid.ts", 1).is_none());
    }

    #[test]
    fn test_namespace_reexport() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/util.ts", "export function tool() {}\n");
        fs.add_file("src/c.ts", "export * as utils from \"./util\";\n");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let map = resolver.export_map("src/c.ts", &mut cache);
        assert_eq!(map["utils"].file, "src/util.ts");
    }

    #[test]
    fn test_resolve_imported_member_through_chain() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/b.ts", "export function h() {}\n");
        fs.add_file("src/c.ts", "export * from \"./b\";\n");
        fs.add_file("src/a.ts", "import { h } from \"./c\";\nh();\n");
        let cfg = config();
        let resolver = ModuleResolver::new(&fs, Path::new(""), &cfg);
        let mut cache = CacheManager::new();

        let mut imports = FileImports::default();
        imports
            .import_map
            .insert("h".to_string(), "src/c.ts".to_string());
        imports
            .import_symbol_map
            .insert("h".to_string(), "h".to_string());

        let target = resolver
            .resolve_imported_member("h", "h", &imports, &mut cache)
            .unwrap();
        assert_eq!(target.file, "src/b.ts");
        assert_eq!(target.depth, 2);
    }
}
