//! Directory entities and the CONTAINS forest.
//!
//! Directories are materialized from file paths alone: every ancestor of a
//! scanned file becomes a directory entity, and each directory links its
//! immediate children (files or directories) with one CONTAINS edge. The
//! result is a forest rooted at the repository root (`dir:.`), with each
//! file appearing as a child exactly once.

use crate::entity::{DirectoryEntity, Entity, dir_entity_id, file_entity_id};
use crate::relationship::{Metadata, RelationKind, Relationship};
use crate::utils::parent_dir;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Build directory entities and CONTAINS edges for a set of scanned file
/// paths (repository-relative, normalized).
pub fn directory_stream(
    file_rel_paths: &[String],
    now: DateTime<Utc>,
) -> (Vec<Entity>, Vec<Relationship>) {
    let mut dirs: BTreeSet<String> = BTreeSet::new();
    for file in file_rel_paths {
        let mut dir = parent_dir(file);
        loop {
            let done = !dirs.insert(dir.clone());
            if done || dir == "." {
                break;
            }
            dir = parent_dir(&dir);
        }
        dirs.insert(".".to_string());
    }

    let mut entities = Vec::with_capacity(dirs.len());
    let mut edges = Vec::new();

    for dir in &dirs {
        let depth = if dir == "." {
            0
        } else {
            dir.split('/').count() as u32
        };
        let parent_id = if dir == "." {
            None
        } else {
            Some(dir_entity_id(&parent_dir(dir)))
        };
        entities.push(Entity::Directory(DirectoryEntity {
            id: dir_entity_id(dir),
            path: dir.clone(),
            depth,
            parent_id: parent_id.clone(),
            created: now,
            last_modified: now,
        }));
        if let Some(parent_id) = parent_id {
            edges.push(Relationship::new(
                parent_id,
                RelationKind::Contains,
                dir_entity_id(dir),
                now,
                Metadata::new(),
            ));
        }
    }

    let mut sorted_files: Vec<&String> = file_rel_paths.iter().collect();
    sorted_files.sort();
    sorted_files.dedup();
    for file in sorted_files {
        edges.push(Relationship::new(
            dir_entity_id(&parent_dir(file)),
            RelationKind::Contains,
            file_entity_id(file),
            now,
            Metadata::new(),
        ));
    }

    (entities, edges)
}
