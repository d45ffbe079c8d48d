//! Incremental code knowledge graph extraction for TypeScript codebases.
//!
//! Given a repository of source files, the extractor produces two streams:
//! entities (files, directories, named code symbols) and typed
//! relationships between them (imports, calls, type usages, inheritance,
//! reads/writes, and derived dependencies). Identifiers are stable and
//! deterministic so downstream diffs are meaningful; resolution runs a
//! budgeted four-tier ladder and scores every inferred edge with a
//! confidence gate.

pub mod budget;
pub mod cache;
pub mod config;
pub mod directories;
pub mod entity;
pub mod error;
pub mod facade;
pub mod host;
pub mod incremental;
pub mod logging;
pub mod parsing;
pub mod relationship;
pub mod relationships;
pub mod resolver;
pub mod types;
pub mod utils;

pub use budget::{BudgetStats, CheckerContext, ContextHints, TypeCheckerBudget};
pub use cache::{CacheManager, CacheStats, ExportMap, ExportTarget, FileCacheEntry};
pub use config::{ParserConfig, Settings};
pub use entity::{
    DirectoryEntity, Entity, EntityRef, FileEntity, Parameter, SymbolDetail, SymbolEntity,
    dir_entity_id, file_entity_id, parse_entity_id, symbol_entity_id,
};
pub use error::{ExtractError, ExtractResult, ResolveError, ResolveResult};
pub use facade::{ParseOutcome, ParseRequest, ParserCore};
pub use host::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use incremental::{CancelToken, IncrementalParser};
pub use parsing::Language;
pub use relationship::{
    FromRef, Metadata, RelationKind, Relationship, Resolution, TargetScope, ToRef,
    canonical_relationship_id, is_placeholder_target, parse_relationship_id,
};
pub use resolver::{ModuleResolver, OracleResolution, ProjectOracle, TypeOracle};
pub use types::{Diagnostic, Range, Severity, SymbolKind, Visibility};
