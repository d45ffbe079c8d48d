//! Relationship model: typed edges between entities.
//!
//! Relationship ids are canonical — derived deterministically from
//! `(fromEntityId, type, toEntityId)` — so downstream diffs are driven by id
//! sets rather than emission order. Targets that do not name a known symbol
//! are placeholders and carry a structured `toRef` preserving the intent of
//! the reference for later resolution passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The typed edge vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Imports,
    Calls,
    References,
    Reads,
    Writes,
    Extends,
    Implements,
    Overrides,
    Throws,
    TypeUses,
    ReturnsType,
    ParamType,
    DependsOn,
    Contains,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imports => "IMPORTS",
            Self::Calls => "CALLS",
            Self::References => "REFERENCES",
            Self::Reads => "READS",
            Self::Writes => "WRITES",
            Self::Extends => "EXTENDS",
            Self::Implements => "IMPLEMENTS",
            Self::Overrides => "OVERRIDES",
            Self::Throws => "THROWS",
            Self::TypeUses => "TYPE_USES",
            Self::ReturnsType => "RETURNS_TYPE",
            Self::ParamType => "PARAM_TYPE",
            Self::DependsOn => "DEPENDS_ON",
            Self::Contains => "CONTAINS",
        }
    }

    /// Aggregated kinds collapse multiple syntactic sites per `(from, to)`
    /// pair into one record with an occurrence count.
    pub fn is_aggregated(&self) -> bool {
        matches!(
            self,
            Self::Calls | Self::References | Self::Reads | Self::Writes
        )
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical relationship id for `(from, type, to)`.
pub fn canonical_relationship_id(from: &str, kind: RelationKind, to: &str) -> String {
    format!("rel:{from}|{}|{to}", kind.as_str())
}

/// Round-trip a canonical relationship id back to its `(from, type, to)`
/// key. Entity ids never contain `|`, so the split is unambiguous.
pub fn parse_relationship_id(id: &str) -> Option<(String, RelationKind, String)> {
    let rest = id.strip_prefix("rel:")?;
    let mut parts = rest.splitn(3, '|');
    let from = parts.next()?;
    let kind = parts.next()?;
    let to = parts.next()?;
    let kind = serde_json::from_value(Value::String(kind.to_string())).ok()?;
    Some((from.to_string(), kind, to.to_string()))
}

/// Structured reference carried by placeholder targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ToRef {
    /// Known file; the symbol name may or may not be resolved later.
    FileSymbol {
        file: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },
    /// Name not bound to any analyzed file.
    External { name: String },
    /// Opaque id reference.
    Entity { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FromRef {
    Entity { id: String },
}

/// Whether a target id is a placeholder rather than a known entity id.
/// `file:` targets are placeholders only in their `file:<path>:<symbol>`
/// form; a bare `file:<path>` is the file entity itself.
pub fn is_placeholder_target(id: &str) -> bool {
    if let Some(rest) = id.strip_prefix("file:") {
        return rest.contains(':');
    }
    const PLACEHOLDER_PREFIXES: &[&str] = &[
        "external:", "class:", "interface:", "function:", "typeAlias:", "import:",
    ];
    PLACEHOLDER_PREFIXES.iter().any(|p| id.starts_with(p))
}

/// Build the structured `toRef` for a placeholder target id. `file:` targets
/// become file-symbol references; every other placeholder family is an
/// unbound name.
pub fn to_ref_for_target(id: &str) -> Option<ToRef> {
    if let Some(rest) = id.strip_prefix("file:") {
        // Bare file:<path> is the file entity, not a placeholder.
        let (file, sym) = rest.rsplit_once(':')?;
        let symbol = if sym.is_empty() || sym == "*" {
            None
        } else {
            Some(sym.to_string())
        };
        return Some(ToRef::FileSymbol {
            file: file.to_string(),
            symbol,
        });
    }
    for prefix in ["external:", "class:", "interface:", "function:", "typeAlias:"] {
        if let Some(name) = id.strip_prefix(prefix) {
            return Some(ToRef::External {
                name: name.to_string(),
            });
        }
    }
    if let Some(rest) = id.strip_prefix("import:") {
        return Some(ToRef::External {
            name: rest.to_string(),
        });
    }
    None
}

/// How a reference was resolved to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    Direct,
    ViaImport,
    TypeChecker,
    Heuristic,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ViaImport => "via-import",
            Self::TypeChecker => "type-checker",
            Self::Heuristic => "heuristic",
        }
    }
}

/// Where the target lives relative to the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScope {
    Local,
    Imported,
    External,
    Unknown,
}

impl TargetScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Imported => "imported",
            Self::External => "external",
            Self::Unknown => "unknown",
        }
    }
}

/// Open metadata record: string keys, JSON-serializable values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata(pub Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_entity_id: String,
    pub to_entity_id: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub version: u32,
    #[serde(skip_serializing_if = "Metadata::is_empty", default)]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_ref: Option<ToRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_ref: Option<FromRef>,
}

impl Relationship {
    /// Create an edge with its canonical id and normalization applied:
    /// structured refs are attached and the id recomputed from the
    /// endpoints, so resolution rewrites must go through `retarget`.
    pub fn new(
        from: impl Into<String>,
        kind: RelationKind,
        to: impl Into<String>,
        now: DateTime<Utc>,
        metadata: Metadata,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        let id = canonical_relationship_id(&from, kind, &to);
        let to_ref = to_ref_for_target(&to);
        let from_ref = Some(FromRef::Entity { id: from.clone() });
        Self {
            id,
            from_entity_id: from,
            to_entity_id: to,
            kind,
            created: now,
            last_modified: now,
            version: 1,
            metadata,
            to_ref,
            from_ref,
        }
    }

    /// Rewrite the target (placeholder concretization), updating endpoint,
    /// refs, and canonical id together.
    pub fn retarget(&mut self, to: impl Into<String>) {
        self.to_entity_id = to.into();
        self.to_ref = to_ref_for_target(&self.to_entity_id);
        self.id = canonical_relationship_id(&self.from_entity_id, self.kind, &self.to_entity_id);
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder_target(&self.to_entity_id)
    }
}
