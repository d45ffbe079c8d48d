//! Type oracle: the budgeted "type checker" collaborator.
//!
//! The resolution ladder's third rung. The built-in implementation is a
//! project-index approximation — it answers through the global symbol index,
//! the per-file variable-type bindings, and light syntactic inference —
//! rather than a full compiler. Every method may return `None`; callers fall
//! through to the next rung of the ladder.

use crate::cache::CacheManager;
use std::collections::HashMap;

/// A checker answer: the declaring file (repository-relative) and the
/// canonical symbol name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResolution {
    pub file: String,
    pub name: String,
}

/// The checker surface the relationship builder consumes. Any of these may
/// be unavailable (return `None`); the core tolerates that by design.
pub trait TypeOracle {
    /// `getSymbolAtLocation` analogue: where does `name`, used in
    /// `from_rel`, declare?
    fn symbol_for_name(
        &self,
        name: &str,
        from_rel: &str,
        cache: &CacheManager,
    ) -> Option<OracleResolution>;

    /// `getResolvedSignature` analogue: the declaration a call's callee
    /// resolves to. Falls back to the callee name itself.
    fn call_target(
        &self,
        callee: &str,
        from_rel: &str,
        cache: &CacheManager,
    ) -> Option<OracleResolution> {
        self.symbol_for_name(callee, from_rel, cache)
    }

    /// `getTypeAtLocation` analogue for a receiver expression: the declared
    /// type name of `receiver` inside the current file, if known.
    fn receiver_type(
        &self,
        receiver: &str,
        variable_types: &HashMap<String, String>,
    ) -> Option<String>;
}

/// Built-in oracle backed by the scan's own indexes.
#[derive(Debug, Default)]
pub struct ProjectOracle;

impl ProjectOracle {
    pub fn new() -> Self {
        Self
    }
}

impl TypeOracle for ProjectOracle {
    fn symbol_for_name(
        &self,
        name: &str,
        from_rel: &str,
        cache: &CacheManager,
    ) -> Option<OracleResolution> {
        // Same-file declarations first.
        if let Some(symbol) = cache.lookup_symbol(from_rel, name) {
            return Some(OracleResolution {
                file: symbol.path.clone(),
                name: symbol.name.clone(),
            });
        }
        let candidates = cache.lookup_by_name(name);
        match candidates.len() {
            0 => None,
            1 => Some(OracleResolution {
                file: candidates[0].path.clone(),
                name: candidates[0].name.clone(),
            }),
            _ => {
                // Prefer the candidate sharing the longest leading path
                // prefix with the source file.
                let best = candidates
                    .iter()
                    .max_by_key(|c| shared_prefix_segments(&c.path, from_rel))?;
                if shared_prefix_segments(&best.path, from_rel) == 0 {
                    return None;
                }
                Some(OracleResolution {
                    file: best.path.clone(),
                    name: best.name.clone(),
                })
            }
        }
    }

    fn receiver_type(
        &self,
        receiver: &str,
        variable_types: &HashMap<String, String>,
    ) -> Option<String> {
        variable_types.get(receiver).cloned()
    }
}

/// Count leading path segments two relative paths share.
pub fn shared_prefix_segments(a: &str, b: &str) -> usize {
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| x == y)
        .count()
}

const PREDEFINED_TYPES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "void",
    "any",
    "unknown",
    "never",
    "null",
    "undefined",
    "object",
    "symbol",
    "bigint",
    "this",
];

/// Base name of a type expression: generic arguments, array suffixes, and
/// union/intersection members are stripped; predefined primitives yield
/// nothing (there is no declaration to point an edge at).
pub fn base_type_name(type_text: &str) -> Option<String> {
    let first = type_text
        .split(['|', '&'])
        .next()?
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    let base: &str = first
        .split(['<', '['])
        .next()
        .unwrap_or(first)
        .trim();
    if base.is_empty() || PREDEFINED_TYPES.contains(&base) {
        return None;
    }
    // Literal types ("on" | 1 | true) are not named declarations either.
    if base.starts_with(['"', '\'', '`', '{']) || base.chars().next()?.is_ascii_digit() {
        return None;
    }
    Some(base.to_string())
}

/// Whether a type annotation spells a union (drives dynamic-dispatch
/// detection on property calls).
pub fn is_union_type(type_text: &str) -> bool {
    type_text.contains('|')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCacheEntry;
    use crate::entity::{SymbolEntity, symbol_entity_id};
    use crate::parsing::Language;
    use crate::types::{Range, SymbolKind, Visibility};
    use chrono::Utc;

    fn symbol(rel_path: &str, name: &str) -> SymbolEntity {
        let signature = format!("function {name}()");
        SymbolEntity {
            id: symbol_entity_id(rel_path, name, &signature),
            path: rel_path.to_string(),
            hash: crate::utils::hash_content(&signature),
            language: Language::TypeScript,
            name: name.to_string(),
            kind: SymbolKind::Function,
            signature,
            doc_comment: None,
            visibility: Visibility::Public,
            is_exported: true,
            is_deprecated: false,
            range: Range::new(0, 0, 0, 10),
            detail: Default::default(),
            created: Utc::now(),
            last_modified: Utc::now(),
        }
    }

    fn cache_with(symbols: &[(&str, &str)]) -> CacheManager {
        let mut cache = CacheManager::new();
        let mut by_file: HashMap<String, Vec<SymbolEntity>> = HashMap::new();
        for (path, name) in symbols {
            by_file
                .entry(path.to_string())
                .or_default()
                .push(symbol(path, name));
        }
        for (path, syms) in by_file {
            let mut symbol_map = HashMap::new();
            for sym in syms {
                symbol_map.insert(sym.index_key(), sym);
            }
            cache.set(
                &format!("/repo/{path}"),
                FileCacheEntry {
                    rel_path: path.clone(),
                    content_hash: crate::utils::hash_content(&path),
                    entities: Vec::new(),
                    relationships: Vec::new(),
                    symbol_map,
                    last_modified: Utc::now(),
                },
            );
        }
        cache
    }

    #[test]
    fn test_unique_candidate_resolves() {
        let cache = cache_with(&[("src/b.ts", "helper")]);
        let oracle = ProjectOracle::new();
        let res = oracle.symbol_for_name("helper", "src/a.ts", &cache).unwrap();
        assert_eq!(res.file, "src/b.ts");
    }

    #[test]
    fn test_ambiguous_prefers_path_neighbor() {
        let cache = cache_with(&[("src/auth/util.ts", "encode"), ("src/render/util.ts", "encode")]);
        let oracle = ProjectOracle::new();
        let res = oracle
            .symbol_for_name("encode", "src/auth/login.ts", &cache)
            .unwrap();
        assert_eq!(res.file, "src/auth/util.ts");
    }

    #[test]
    fn test_ambiguous_without_shared_prefix_stays_unresolved() {
        let cache = cache_with(&[("lib/x.ts", "encode"), ("vendor/y.ts", "encode")]);
        let oracle = ProjectOracle::new();
        assert!(oracle.symbol_for_name("encode", "src/a.ts", &cache).is_none());
    }

    #[test]
    fn test_receiver_type_from_bindings() {
        let oracle = ProjectOracle::new();
        let mut types = HashMap::new();
        types.insert("svc".to_string(), "UserService".to_string());
        assert_eq!(
            oracle.receiver_type("svc", &types),
            Some("UserService".to_string())
        );
        assert_eq!(oracle.receiver_type("other", &types), None);
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("Foo<T>"), Some("Foo".to_string()));
        assert_eq!(base_type_name("Foo[]"), Some("Foo".to_string()));
        assert_eq!(base_type_name("Foo | Bar"), Some("Foo".to_string()));
        assert_eq!(base_type_name("(Foo)"), Some("Foo".to_string()));
        assert_eq!(base_type_name("string"), None);
        assert_eq!(base_type_name("\"literal\""), None);
        assert_eq!(base_type_name("42"), None);
    }

    #[test]
    fn test_union_detection() {
        assert!(is_union_type("Foo | Bar"));
        assert!(!is_union_type("Foo"));
    }
}
