//! Single-commit filtering
//!
//! Rewrites one commit against the filter, carrying author, committer and
//! message over verbatim and dropping any signature block. Two collapse
//! rules keep the output history tight:
//!
//! - a commit whose filtered tree is empty produces no output commit
//! - a commit whose filtered tree equals its parent's collapses into the
//!   parent (the parent is returned, nothing new is written)

use crate::areas::database::Database;
use crate::artifacts::core::wrap_unless_cancelled;
use crate::artifacts::filter::Filter;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::artifacts::rewrite::tree_filter::filter_tree;
use anyhow::Context;
use tokio_util::sync::CancellationToken;

/// Filter one commit into the output store
///
/// Returns `None` when the filtered tree is empty, the parent itself when
/// the commit collapses, and otherwise the freshly written commit with
/// `parent` (if any) as its only parent.
pub fn filter_commit(
    cancel: &CancellationToken,
    source: &Database,
    commit: &Commit,
    parent: Option<&Commit>,
    output: &Database,
    filter: &dyn Filter,
) -> anyhow::Result<Option<Commit>> {
    let tree = source
        .parse_object_as_tree(commit.tree_oid())
        .with_context(|| {
            format!(
                "failed to obtain tree for commit {}",
                commit.object_id().unwrap_or_default()
            )
        })?;

    let new_tree = filter_tree(cancel, source, &tree, &[], output, filter)
        .map_err(|err| wrap_unless_cancelled(err, || "failed to filter tree".to_string()))?;

    let Some(new_tree) = new_tree else {
        return Ok(None);
    };
    let new_tree_oid = new_tree.object_id()?;

    let mut parents = Vec::new();
    if let Some(parent) = parent {
        if *parent.tree_oid() == new_tree_oid {
            return Ok(Some(parent.clone()));
        }
        parents.push(parent.object_id()?);
    }

    let new_commit = Commit::new(
        parents,
        new_tree_oid,
        commit.author().clone(),
        commit.committer().clone(),
        commit.message().to_string(),
    );

    output
        .store(&new_commit)
        .map_err(|err| wrap_unless_cancelled(err, || "failed to save commit".to_string()))?;

    Ok(Some(new_commit))
}
