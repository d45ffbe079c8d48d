//! Entity model: files, directories, and named code symbols.
//!
//! Every entity carries a stable unique id, a type tag, a canonical
//! repository-relative path, a content hash, a language tag, and first-seen /
//! last-modified timestamps. Symbol ids embed a short signature hash so
//! overloads and same-named declarations stay distinct while remaining
//! stable across scans whenever `(relPath, name, signature)` is unchanged.

use crate::parsing::Language;
use crate::types::{Range, SymbolKind, Visibility};
use crate::utils::short_hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build a file entity id: `file:<relPath>`.
pub fn file_entity_id(rel_path: &str) -> String {
    format!("file:{rel_path}")
}

/// Build a directory entity id: `dir:<relPath>`.
pub fn dir_entity_id(rel_path: &str) -> String {
    format!("dir:{rel_path}")
}

/// Build a symbol entity id: `sym:<relPath>#<name>@<shortHash(signature)>`.
pub fn symbol_entity_id(rel_path: &str, name: &str, signature: &str) -> String {
    format!("sym:{rel_path}#{name}@{}", short_hash(signature))
}

/// Structured view of a well-formed entity id, for round-tripping ids back
/// to display coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityRef {
    File { rel_path: String },
    Directory { rel_path: String },
    Symbol { rel_path: String, name: String },
}

/// Parse an entity id back to `{relPath, name?}`. Returns `None` for ids
/// that are not well-formed entity ids (placeholder targets included).
pub fn parse_entity_id(id: &str) -> Option<EntityRef> {
    if let Some(rest) = id.strip_prefix("file:") {
        return Some(EntityRef::File {
            rel_path: rest.to_string(),
        });
    }
    if let Some(rest) = id.strip_prefix("dir:") {
        return Some(EntityRef::Directory {
            rel_path: rest.to_string(),
        });
    }
    if let Some(rest) = id.strip_prefix("sym:") {
        let (rel_path, tail) = rest.split_once('#')?;
        let (name, _hash) = tail.rsplit_once('@')?;
        return Some(EntityRef::Symbol {
            rel_path: rel_path.to_string(),
            name: name.to_string(),
        });
    }
    None
}

/// One parameter of a function or method symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub optional: bool,
}

/// Kind-specialized attributes of a symbol entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SymbolDetail {
    #[serde(rename_all = "camelCase")]
    Function {
        parameters: Vec<Parameter>,
        #[serde(skip_serializing_if = "Option::is_none")]
        return_type: Option<String>,
        is_async: bool,
        is_generator: bool,
        complexity: u32,
    },
    #[serde(rename_all = "camelCase")]
    Class {
        #[serde(skip_serializing_if = "Option::is_none")]
        extends: Option<String>,
        implements: Vec<String>,
        is_abstract: bool,
    },
    Interface {
        extends: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    TypeAlias {
        aliased: String,
        is_union: bool,
        is_intersection: bool,
    },
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntity {
    pub id: String,
    pub path: String,
    pub hash: String,
    pub language: Language,
    pub extension: String,
    pub lines: u32,
    pub size: u64,
    /// Top-level imported bare package names.
    pub dependencies: Vec<String>,
    pub is_test: bool,
    pub is_config: bool,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntity {
    pub id: String,
    pub path: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolEntity {
    pub id: String,
    pub path: String,
    pub hash: String,
    pub language: Language,
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
    pub visibility: Visibility,
    pub is_exported: bool,
    pub is_deprecated: bool,
    pub range: Range,
    #[serde(default, skip_serializing_if = "detail_is_none")]
    pub detail: SymbolDetail,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

fn detail_is_none(detail: &SymbolDetail) -> bool {
    matches!(detail, SymbolDetail::None)
}

impl SymbolEntity {
    /// The `<relPath>:<name>` key used by the local and global symbol
    /// indexes.
    pub fn index_key(&self) -> String {
        format!("{}:{}", self.path, self.name)
    }
}

/// Any record emitted on the entity stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entity {
    File(FileEntity),
    Directory(DirectoryEntity),
    Symbol(SymbolEntity),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::File(f) => &f.id,
            Entity::Directory(d) => &d.id,
            Entity::Symbol(s) => &s.id,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Entity::File(f) => &f.path,
            Entity::Directory(d) => &d.path,
            Entity::Symbol(s) => &s.path,
        }
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            Entity::File(f) => Some(&f.hash),
            Entity::Directory(_) => None,
            Entity::Symbol(s) => Some(&s.hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_shape() {
        let id = symbol_entity_id("src/a.ts", "f", "function f(): void");
        assert!(id.starts_with("sym:src/a.ts#f@"));
        // 8 hex chars of disambiguator
        let hash = id.rsplit('@').next().unwrap();
        assert_eq!(hash.len(), 8);
    }

    #[test]
    fn test_symbol_id_stable_for_same_signature() {
        let a = symbol_entity_id("src/a.ts", "f", "function f(x: number)");
        let b = symbol_entity_id("src/a.ts", "f", "function f(x: number)");
        let c = symbol_entity_id("src/a.ts", "f", "function f(x: string)");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_entity_id_round_trip() {
        assert_eq!(
            parse_entity_id("file:src/a.ts"),
            Some(EntityRef::File {
                rel_path: "src/a.ts".to_string()
            })
        );
        assert_eq!(
            parse_entity_id("dir:src"),
            Some(EntityRef::Directory {
                rel_path: "src".to_string()
            })
        );
        let id = symbol_entity_id("src/a.ts", "handler", "function handler()");
        assert_eq!(
            parse_entity_id(&id),
            Some(EntityRef::Symbol {
                rel_path: "src/a.ts".to_string(),
                name: "handler".to_string()
            })
        );
        assert_eq!(parse_entity_id("external:frobnicate"), None);
    }

    #[test]
    fn test_round_trip_identity_for_well_formed_ids() {
        let id = symbol_entity_id("lib/util.ts", "deepMerge", "function deepMerge(a, b)");
        let parsed = parse_entity_id(&id).unwrap();
        match parsed {
            EntityRef::Symbol { rel_path, name } => {
                let rebuilt = symbol_entity_id(&rel_path, &name, "function deepMerge(a, b)");
                assert_eq!(rebuilt, id);
            }
            other => panic!("unexpected ref: {other:?}"),
        }
    }

    #[test]
    fn test_symbol_name_with_at_sign_parses() {
        // rsplit on '@' keeps decorator-ish names intact
        let id = "sym:src/a.ts#weird@name@deadbeef";
        assert_eq!(
            parse_entity_id(id),
            Some(EntityRef::Symbol {
                rel_path: "src/a.ts".to_string(),
                name: "weird@name".to_string()
            })
        );
    }
}
