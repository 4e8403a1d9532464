//! Whole-subtree copy between stores
//!
//! Used when a filter answers `In` for a directory: the subtree is copied
//! verbatim, digest-for-digest, with no further filtering.

use crate::areas::database::Database;
use crate::artifacts::core::{ensure_not_cancelled, wrap_unless_cancelled};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Copy a tree and everything below it into the output store
///
/// Returns immediately when the output store already holds the tree.
/// Blobs and subtrees are written before the trees referencing them.
pub fn copy_tree(
    cancel: &CancellationToken,
    source: &Database,
    tree: &Tree,
    output: &Database,
) -> anyhow::Result<()> {
    let tree_oid = tree.object_id()?;
    if output.has(&tree_oid) {
        debug!(hash = %tree_oid, "tree exists, not copying");
        return Ok(());
    }

    debug!(hash = %tree_oid, "copy tree");
    for entry in tree.entries() {
        ensure_not_cancelled(cancel)?;

        match entry.mode {
            mode if mode.is_blob_like() => {
                if output.has(&entry.oid) {
                    continue;
                }
                source
                    .copy_object_to(&entry.oid, output)
                    .with_context(|| format!("failed to copy blob {}", entry.oid))?;
            }
            EntryMode::Submodule => {
                warn!(path = %entry.name, "ignoring submodule");
            }
            EntryMode::Empty => continue,
            EntryMode::Directory => {
                let subtree = source
                    .parse_object_as_tree(&entry.oid)
                    .with_context(|| {
                        format!("failed to find sub tree {} {}", entry.name, entry.oid)
                    })?;

                copy_tree(cancel, source, &subtree, output).map_err(|err| {
                    wrap_unless_cancelled(err, || {
                        format!("failed to copy sub tree {} {}", entry.name, entry.oid)
                    })
                })?;
            }
            _ => continue,
        }
    }

    output
        .store(tree)
        .map(|_| ())
        .with_context(|| format!("failed to save tree {tree_oid}"))
}
