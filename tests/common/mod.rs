//! Shared fixtures for integration tests: an in-memory repository behind
//! the parser core.
#![allow(dead_code)]

use codegraph::{MemoryFileSystem, ParserCore, RelationKind, Relationship, Settings};
use std::sync::Arc;

pub const ROOT: &str = "/repo";

/// Build a core over an in-memory repository. The returned handle to the
/// file system allows tests to mutate files between scans.
pub fn core_with_files(files: &[(&str, &str)]) -> (ParserCore, Arc<MemoryFileSystem>) {
    let fs = Arc::new(MemoryFileSystem::new());
    for (path, content) in files {
        fs.add_file(format!("{ROOT}/{path}"), *content);
    }
    let core = ParserCore::with_file_system(ROOT, Settings::default(), Box::new(fs.clone()));
    (core, fs)
}

pub fn edges_of_kind(relationships: &[Relationship], kind: RelationKind) -> Vec<&Relationship> {
    relationships.iter().filter(|r| r.kind == kind).collect()
}

pub fn find_edge<'a>(
    relationships: &'a [Relationship],
    kind: RelationKind,
    from_contains: &str,
    to_contains: &str,
) -> Option<&'a Relationship> {
    relationships.iter().find(|r| {
        r.kind == kind
            && r.from_entity_id.contains(from_contains)
            && r.to_entity_id.contains(to_contains)
    })
}
