//! Commit expansion
//!
//! The inverse of filtering: take the diff between two filtered commits
//! and re-apply it to an unfiltered target. Three passes over the patches
//! keep the operation transactional and rename-safe:
//!
//! 1. validation — every touched path must be admitted by the filter;
//!    every offending path is collected and reported at once, and nothing
//!    is written before this pass succeeds
//! 2. deletions — removed files and rename sources leave the edit tree,
//!    with digest and mode validated against the target's content
//! 3. writes — added, renamed and modified files enter the edit tree, with
//!    their blobs copied into the target store
//!
//! Deletions precede writes so a swap or a case-only rename cannot
//! collide with a surviving entry of the same name.

pub mod edit_tree;

use crate::areas::database::Database;
use crate::artifacts::core::{ensure_not_cancelled, wrap_unless_cancelled};
use crate::artifacts::diff::tree_diff::{FilePatch, tree_diff};
use crate::artifacts::expand::edit_tree::EditTree;
use crate::artifacts::filter::Filter;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A single file patch rejected by the expansion filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct FilePatchError {
    /// Rejected source-side path, if any
    pub from_path: Option<String>,
    /// Rejected target-side path, if any
    pub to_path: Option<String>,
}

impl std::fmt::Display for FilePatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if let Some(from_path) = &self.from_path {
            parts.push(format!("invalid from path: {from_path}"));
        }
        if let Some(to_path) = &self.to_path {
            parts.push(format!("invalid to path: {to_path}"));
        }

        write!(f, "{}", parts.join("|"))
    }
}

/// Every file patch rejected during expansion pre-check, reported at once
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct PatchValidationError {
    pub patches: Vec<FilePatchError>,
}

impl std::fmt::Display for PatchValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.patches.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Apply the diff between two filtered trees onto a target tree
///
/// Returns the rebuilt target tree, already written to the target store.
pub fn expand_tree(
    cancel: &CancellationToken,
    source: &Database,
    filtered_orig: &Tree,
    filtered_new: &Tree,
    target: &Tree,
    target_store: &Database,
    filter: &dyn Filter,
) -> anyhow::Result<Tree> {
    let patches = tree_diff(source, Some(filtered_orig), Some(filtered_new))
        .context("failed to generate patch for the two filtered trees")?;

    // first pass: collect every patch the filter rejects
    let mut errors = Vec::new();
    for (idx, patch) in patches.iter().enumerate() {
        ensure_not_cancelled(cancel)?;

        debug!(
            idx,
            operation = patch.operation(),
            from = patch.from.as_ref().map(|s| s.path.as_str()).unwrap_or(""),
            to = patch.to.as_ref().map(|s| s.path.as_str()).unwrap_or(""),
            "patch"
        );

        let mut patch_error = FilePatchError::default();
        if let Some(from) = &patch.from {
            if !filter.filter(&split_path(&from.path), false).is_in() {
                patch_error.from_path = Some(from.path.clone());
            }
        }
        if let Some(to) = &patch.to {
            if !filter.filter(&split_path(&to.path), false).is_in() {
                patch_error.to_path = Some(to.path.clone());
            }
        }
        if patch_error.from_path.is_some() || patch_error.to_path.is_some() {
            errors.push(patch_error);
        }
    }

    if !errors.is_empty() {
        return Err(anyhow::Error::new(PatchValidationError { patches: errors }));
    }

    let mut edit_tree = EditTree::new(target_store, target.clone())?;

    // second pass: deletions and rename sources
    for patch in &patches {
        ensure_not_cancelled(cancel)?;

        let Some(from) = &patch.from else {
            continue;
        };
        if !is_delete_or_rename(patch) {
            continue;
        }
        if from.mode == EntryMode::Submodule {
            warn!(path = %from.path, "silently ignore submodule in from-file");
            continue;
        }

        edit_tree
            .delete(&from.oid, from.mode, &split_path(&from.path))
            .map_err(|err| {
                wrap_unless_cancelled(err, || format!("failed to delete file {}", from.path))
            })?;
    }

    // third pass: writes (new, renamed, or modified files)
    for patch in &patches {
        ensure_not_cancelled(cancel)?;

        let Some(to) = &patch.to else {
            continue;
        };
        if to.mode == EntryMode::Submodule {
            warn!(path = %to.path, "silently ignore submodule in to-file");
            continue;
        }

        edit_tree
            .update(source, target_store, &to.oid, to.mode, &split_path(&to.path))
            .map_err(|err| {
                wrap_unless_cancelled(err, || {
                    format!("failed to update file {} {}", to.path, to.oid)
                })
            })?;
    }

    edit_tree.build_tree(cancel, target_store)
}

/// Re-apply the change between two filtered commits onto a target commit
///
/// The new commit copies author, committer and message from
/// `filtered_new`, parents onto `target`, and carries the expanded tree.
pub fn expand_commit(
    cancel: &CancellationToken,
    source: &Database,
    filtered_orig: &Commit,
    filtered_new: &Commit,
    target: &Commit,
    target_store: &Database,
    filter: &dyn Filter,
) -> anyhow::Result<Commit> {
    let filtered_orig_tree = source
        .parse_object_as_tree(filtered_orig.tree_oid())
        .context("failed to obtain filtered parent tree")?;
    let filtered_new_tree = source
        .parse_object_as_tree(filtered_new.tree_oid())
        .context("failed to obtain filtered new tree")?;
    let target_tree = target_store
        .parse_object_as_tree(target.tree_oid())
        .context("failed to obtain target parent tree")?;

    let new_tree = expand_tree(
        cancel,
        source,
        &filtered_orig_tree,
        &filtered_new_tree,
        &target_tree,
        target_store,
        filter,
    )
    .map_err(|err| {
        wrap_unless_cancelled(err, || "failed to expand tree for target".to_string())
    })?;

    if new_tree.is_empty() {
        warn!(
            filtered_new_commit = %filtered_new.object_id().unwrap_or_default(),
            filtered_orig_commit = %filtered_orig.object_id().unwrap_or_default(),
            target = %target.object_id().unwrap_or_default(),
            "empty tree"
        );
    }

    let new_commit = Commit::new(
        vec![target.object_id()?],
        new_tree.object_id()?,
        filtered_new.author().clone(),
        filtered_new.committer().clone(),
        filtered_new.message().to_string(),
    );

    target_store
        .store(&new_commit)
        .map_err(|err| {
            wrap_unless_cancelled(err, || "failed to save the new commit into storage".to_string())
        })?;

    Ok(new_commit)
}

/// A patch's `from` side must be removed when the file is deleted or the
/// patch moves it to a different path
fn is_delete_or_rename(patch: &FilePatch) -> bool {
    match (&patch.from, &patch.to) {
        (Some(_), None) => true,
        (Some(from), Some(to)) => from.path != to.path,
        _ => false,
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_patch_error_renders_both_sides_pipe_joined() {
        let error = FilePatchError {
            from_path: Some("src/a.js".to_string()),
            to_path: Some("src/b.js".to_string()),
        };

        assert_eq!(
            error.to_string(),
            "invalid from path: src/a.js|invalid to path: src/b.js"
        );
    }

    #[test]
    fn file_patch_error_renders_single_side() {
        let error = FilePatchError {
            from_path: None,
            to_path: Some("src/b.js".to_string()),
        };

        assert_eq!(error.to_string(), "invalid to path: src/b.js");
    }

    #[test]
    fn validation_error_reports_every_patch() {
        let error = PatchValidationError {
            patches: vec![
                FilePatchError {
                    from_path: Some("a".to_string()),
                    to_path: None,
                },
                FilePatchError {
                    from_path: None,
                    to_path: Some("b".to_string()),
                },
            ],
        };

        assert_eq!(
            error.to_string(),
            "invalid from path: a\ninvalid to path: b"
        );
    }
}
