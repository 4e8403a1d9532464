//! File-level patches between two trees
//!
//! A patch has an optional `from` side (absent for additions) and an
//! optional `to` side (absent for deletions); a content or mode change at
//! one path carries both sides. Renames are not detected: they surface as
//! a deletion plus an addition, which is exactly what the expansion passes
//! expect.

use crate::areas::database::Database;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::objects::entry_mode::EntryMode;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};

/// One side of a file-level patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSide {
    /// Full path from the repository root, `/`-joined
    pub path: String,
    /// Entry mode on this side
    pub mode: EntryMode,
    /// Blob digest on this side
    pub oid: ObjectId,
}

/// A single file-level change between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// State before the change; absent for additions
    pub from: Option<PatchSide>,
    /// State after the change; absent for deletions
    pub to: Option<PatchSide>,
}

impl FilePatch {
    /// Short operation name for log output
    pub fn operation(&self) -> &'static str {
        match (&self.from, &self.to) {
            (None, Some(_)) => "add",
            (Some(_), None) => "delete",
            (Some(from), Some(to)) if from.path != to.path => "rename",
            _ => "modify",
        }
    }
}

/// Compute the ordered file-level patches between two trees
///
/// Both trees must live in `database`. Unchanged entries are skipped
/// without loading their subtrees.
pub fn tree_diff(
    database: &Database,
    old: Option<&Tree>,
    new: Option<&Tree>,
) -> anyhow::Result<Vec<FilePatch>> {
    let mut patches = Vec::new();

    let old_entries = entry_map(old);
    let new_entries = entry_map(new);
    compare_entries(database, &old_entries, &new_entries, "", &mut patches)?;

    Ok(patches)
}

fn entry_map(tree: Option<&Tree>) -> BTreeMap<String, TreeEntry> {
    tree.map(|t| {
        t.entries()
            .iter()
            .map(|entry| (entry.name.clone(), entry.clone()))
            .collect()
    })
    .unwrap_or_default()
}

fn compare_entries(
    database: &Database,
    old_entries: &BTreeMap<String, TreeEntry>,
    new_entries: &BTreeMap<String, TreeEntry>,
    prefix: &str,
    patches: &mut Vec<FilePatch>,
) -> anyhow::Result<()> {
    let names: BTreeSet<&String> = old_entries.keys().chain(new_entries.keys()).collect();

    for name in names {
        let old_entry = old_entries.get(name);
        let new_entry = new_entries.get(name);
        if old_entry == new_entry {
            continue;
        }

        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        let old_subtree = load_subtree(database, old_entry, &path)?;
        let new_subtree = load_subtree(database, new_entry, &path)?;
        if old_subtree.is_some() || new_subtree.is_some() {
            compare_entries(
                database,
                &entry_map(old_subtree.as_ref()),
                &entry_map(new_subtree.as_ref()),
                &path,
                patches,
            )?;
        }

        let from = patch_side(old_entry, &path);
        let to = patch_side(new_entry, &path);
        match (from, to) {
            (Some(from), Some(to)) => {
                if from.mode != to.mode || from.oid != to.oid {
                    patches.push(FilePatch {
                        from: Some(from),
                        to: Some(to),
                    });
                }
            }
            (Some(from), None) => patches.push(FilePatch {
                from: Some(from),
                to: None,
            }),
            (None, Some(to)) => patches.push(FilePatch {
                from: None,
                to: Some(to),
            }),
            (None, None) => {}
        }
    }

    Ok(())
}

fn load_subtree(
    database: &Database,
    entry: Option<&TreeEntry>,
    path: &str,
) -> anyhow::Result<Option<Tree>> {
    match entry {
        Some(entry) if entry.mode.is_tree() => Ok(Some(
            database
                .parse_object_as_tree(&entry.oid)
                .with_context(|| format!("failed to load subtree at {path}"))?,
        )),
        _ => Ok(None),
    }
}

/// A patch side exists for non-directory entries only
fn patch_side(entry: Option<&TreeEntry>, path: &str) -> Option<PatchSide> {
    entry
        .filter(|entry| !entry.mode.is_tree())
        .map(|entry| PatchSide {
            path: path.to_string(),
            mode: entry.mode,
            oid: entry.oid.clone(),
        })
}
