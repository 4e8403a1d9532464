//! Linear-history retrieval and the filtering driver
//!
//! Histories are handled oldest-first. The driver enforces two rules that
//! keep the rewritten chain well-formed:
//!
//! - an empty rewritten commit restarts the chain: everything accumulated
//!   so far is dropped and the next non-empty commit becomes the new root
//! - a commit collapsing into its parent is simply not appended
//!
//! Both rules exist for determinism: the output chain is a pure function
//! of the input commits and the filter.

use crate::areas::database::Database;
use crate::artifacts::core::{ensure_not_cancelled, wrap_unless_cancelled};
use crate::artifacts::filter::Filter;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rewrite::commit_filter::filter_commit;
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Walk the first-parent chain from `head`, oldest first
///
/// Stops at `start` (inclusive) when given, after `num_commits` commits
/// when `num_commits > 0`, or at the root. Fails on any commit with more
/// than one parent: this rewriter only handles linear histories.
pub fn get_linear_history(
    cancel: &CancellationToken,
    database: &Database,
    head: &Commit,
    start: Option<&ObjectId>,
    num_commits: usize,
) -> anyhow::Result<Vec<Commit>> {
    let mut result = Vec::new();

    let mut current = head.clone();
    loop {
        ensure_not_cancelled(cancel)?;

        let current_oid = current.object_id()?;
        let parents = current.parents().len();

        result.push(current.clone());

        if let Some(start) = start {
            if *start == current_oid {
                break;
            }
        }
        if num_commits > 0 && result.len() >= num_commits {
            break;
        }
        if parents > 1 {
            return Err(anyhow::anyhow!(
                "commit {current_oid} has {parents} parents, and is not linear"
            ));
        }

        let Some(parent_oid) = current.parent().cloned() else {
            break;
        };
        current = database
            .parse_object_as_commit(&parent_oid)
            .with_context(|| format!("failed to obtain parent for commit {current_oid}"))?;
    }

    result.reverse();

    Ok(result)
}

/// Filter a linear history, oldest first, into the output store
///
/// Returns the new chain oldest-first. Identical inputs produce identical
/// outputs, digest for digest.
pub fn filter_linear_history(
    cancel: &CancellationToken,
    source: &Database,
    history: &[Commit],
    output: &Database,
    filter: &dyn Filter,
) -> anyhow::Result<Vec<Commit>> {
    let mut new_history: Vec<Commit> = Vec::with_capacity(history.len());

    let mut prev_commit: Option<Commit> = None;
    let mut prev_oid: Option<ObjectId> = None;

    for (idx, commit) in history.iter().enumerate() {
        ensure_not_cancelled(cancel)?;

        let new_commit = filter_commit(
            cancel,
            source,
            commit,
            prev_commit.as_ref(),
            output,
            filter,
        )
        .map_err(|err| {
            wrap_unless_cancelled(err, || {
                format!(
                    "failed to generate commit at {idx} for commit {}",
                    commit.object_id().unwrap_or_default()
                )
            })
        })?;

        match new_commit {
            None => {
                // an empty rewrite invalidates everything accumulated so far
                info!(
                    id = idx,
                    hash = %commit.object_id().unwrap_or_default(),
                    newcommit = "empty",
                    "processing commit"
                );
                new_history.clear();
                prev_commit = None;
                prev_oid = None;
            }
            Some(new_commit) => {
                let new_oid = new_commit.object_id()?;
                let commit_info =
                    format!("{new_oid} by {}", new_commit.author().display_name());
                info!(
                    id = idx,
                    hash = %commit.object_id().unwrap_or_default(),
                    newcommit = %commit_info,
                    "processing commit"
                );

                // a commit collapsing into its parent is not appended
                if prev_oid.as_ref() != Some(&new_oid) {
                    new_history.push(new_commit.clone());
                }
                prev_commit = Some(new_commit);
                prev_oid = Some(new_oid);
            }
        }
    }

    Ok(new_history)
}
