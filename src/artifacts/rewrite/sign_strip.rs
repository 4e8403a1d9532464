//! Signature stripping
//!
//! Rebuilds a linear history with every signature block dropped and the
//! parent links re-stitched. Trees, authors, committers and messages are
//! untouched, so the only digest changes come from the removed signatures
//! and the relinked parents. Running the rewrite on its own output changes
//! nothing.

use crate::areas::database::Database;
use crate::artifacts::core::ensure_not_cancelled;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Rebuild a linear history, oldest first, without signature blocks
///
/// The first rebuilt commit keeps the ancestry of the input's first commit
/// (its original parent, or none for a root); every later commit parents
/// onto its rebuilt predecessor.
pub fn remove_signatures_for_linear_history(
    cancel: &CancellationToken,
    history: &[Commit],
    output: &Database,
) -> anyhow::Result<Vec<Commit>> {
    let mut new_history = Vec::with_capacity(history.len());

    let mut prev_commit: Option<Commit> = None;

    for (idx, commit) in history.iter().enumerate() {
        ensure_not_cancelled(cancel)?;

        let parents = match &prev_commit {
            Some(prev) => vec![prev.object_id()?],
            None => commit.parent().cloned().into_iter().collect(),
        };

        let new_commit = Commit::new(
            parents,
            commit.tree_oid().clone(),
            commit.author().clone(),
            commit.committer().clone(),
            commit.message().to_string(),
        );

        let new_oid = new_commit.object_id()?;
        debug!(
            id = idx,
            commit = %commit.object_id().unwrap_or_default(),
            newcommit = %new_oid,
            "strip signature"
        );

        output
            .store(&new_commit)
            .with_context(|| format!("failed to save new commit {new_oid} to storage"))?;

        new_history.push(new_commit.clone());
        prev_commit = Some(new_commit);
    }

    Ok(new_history)
}
