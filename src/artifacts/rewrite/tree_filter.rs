//! Recursive tree filtering
//!
//! The heart of a rewrite: walk a tree in stored order, keep the entries
//! the filter admits, and write the surviving blobs and rebuilt trees into
//! the output store. A directory answered `In` is copied whole, `Out` is
//! pruned whole, and only `DirDive` recurses.

use crate::areas::database::Database;
use crate::artifacts::core::{ensure_not_cancelled, wrap_unless_cancelled};
use crate::artifacts::filter::Filter;
use crate::artifacts::filter::FilterResult;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::rewrite::tree_copy::copy_tree;
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Filter one tree into the output store
///
/// Entries are visited in stored order, so the rebuilt tree preserves the
/// source ordering and its digest is fully determined by the surviving
/// entries. Returns `None` when nothing survives; an empty tree is never
/// materialized.
///
/// Submodule entries are logged and skipped.
pub fn filter_tree(
    cancel: &CancellationToken,
    source: &Database,
    tree: &Tree,
    prefix_path: &[String],
    output: &Database,
    filter: &dyn Filter,
) -> anyhow::Result<Option<Tree>> {
    let mut new_entries: Vec<TreeEntry> = Vec::with_capacity(tree.len());

    for entry in tree.entries() {
        ensure_not_cancelled(cancel)?;

        let mut full_path = prefix_path.to_vec();
        full_path.push(entry.name.clone());
        let full_path_string = full_path.join("/");

        match entry.mode {
            mode if mode.is_blob_like() => {
                if !filter.filter(&full_path, false).is_in() {
                    continue;
                }

                if !output.has(&entry.oid) {
                    source.copy_object_to(&entry.oid, output).map_err(|err| {
                        wrap_unless_cancelled(err, || {
                            format!(
                                "failed to write {} {} into new repo",
                                entry.mode, full_path_string
                            )
                        })
                    })?;
                }
                new_entries.push(entry.clone());
            }
            EntryMode::Submodule => {
                warn!(path = %full_path_string, "ignoring submodule");
                continue;
            }
            EntryMode::Empty => continue,
            EntryMode::Directory => {
                let subtree = source.parse_object_as_tree(&entry.oid).with_context(|| {
                    format!("failed to find sub tree {full_path_string}")
                })?;

                let new_subtree = match filter.filter(&full_path, true) {
                    FilterResult::Out => continue,
                    FilterResult::In => {
                        copy_tree(cancel, source, &subtree, output).map_err(|err| {
                            wrap_unless_cancelled(err, || {
                                format!("failed to copy sub tree {full_path_string}")
                            })
                        })?;

                        Some(subtree)
                    }
                    FilterResult::DirDive => {
                        filter_tree(cancel, source, &subtree, &full_path, output, filter)?
                    }
                };

                let Some(new_subtree) = new_subtree else {
                    continue;
                };

                new_entries.push(TreeEntry::new(
                    entry.name.clone(),
                    entry.mode,
                    new_subtree.object_id()?,
                ));
            }
            _ => continue,
        }
    }

    if new_entries.is_empty() {
        debug!(prefix = %prefix_path.join("/"), "empty tree");
        return Ok(None);
    }

    let new_tree = Tree::new(new_entries);
    output
        .store(&new_tree)
        .with_context(|| {
            format!(
                "failed to save the new tree {}",
                prefix_path.join("/")
            )
        })?;

    Ok(Some(new_tree))
}
