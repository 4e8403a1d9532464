//! In-flight tree edits
//!
//! An `EditTree` is a mutable overlay on a base tree, built once per
//! expansion and thrown away afterwards. Non-directory entries and child
//! overlays live in two disjoint name maps; deletions are validated
//! strictly against the base (name, digest and mode must all match), while
//! updates create missing intermediate directories without validation —
//! the expansion contract places that burden on the caller.

use crate::areas::database::Database;
use crate::artifacts::core::{ensure_not_cancelled, wrap_unless_cancelled};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use anyhow::Context;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Mutable overlay on a base tree
pub struct EditTree {
    /// Non-directory entries by name
    files: BTreeMap<String, TreeEntry>,
    /// Child overlays by name; disjoint from `files`
    dirs: BTreeMap<String, EditTree>,

    dirty: bool,

    base_tree: Tree,
}

impl EditTree {
    /// Materialize an overlay from a base tree, recursing into every
    /// directory entry
    pub fn new(database: &Database, base_tree: Tree) -> anyhow::Result<Self> {
        let mut files = BTreeMap::new();
        let mut dirs = BTreeMap::new();

        for entry in base_tree.entries() {
            match entry.mode {
                EntryMode::Directory => {
                    let subtree = database.parse_object_as_tree(&entry.oid).with_context(
                        || format!("failed to obtain sub tree at {}", entry.name),
                    )?;
                    let child = EditTree::new(database, subtree).with_context(|| {
                        format!("failed to create sub edit tree at {}", entry.name)
                    })?;
                    dirs.insert(entry.name.clone(), child);
                }
                _ => {
                    files.insert(entry.name.clone(), entry.clone());
                }
            }
        }

        Ok(EditTree {
            files,
            dirs,
            dirty: false,
            base_tree,
        })
    }

    fn empty() -> Self {
        EditTree {
            files: BTreeMap::new(),
            dirs: BTreeMap::new(),
            dirty: false,
            base_tree: Tree::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Set a non-directory entry, copying its blob between stores
    ///
    /// Overwrites any existing entry of that name.
    pub fn update_file(
        &mut self,
        source: &Database,
        target: &Database,
        oid: &ObjectId,
        mode: EntryMode,
        filename: &str,
    ) -> anyhow::Result<()> {
        self.files.insert(
            filename.to_string(),
            TreeEntry::new(filename.to_string(), mode, oid.clone()),
        );

        debug!(name = filename, hash = %oid, "update file");

        source
            .copy_object_to(oid, target)
            .with_context(|| format!("failed to copy object with hash {oid}"))?;

        self.dirty = true;

        Ok(())
    }

    /// Set an entry at a path, creating missing intermediate overlays
    pub fn update(
        &mut self,
        source: &Database,
        target: &Database,
        oid: &ObjectId,
        mode: EntryMode,
        path_segments: &[String],
    ) -> anyhow::Result<()> {
        match path_segments {
            [] => Err(anyhow::anyhow!("zero length path segment for file: {oid}")),
            [filename] => self.update_file(source, target, oid, mode, filename),
            [folder, rest @ ..] => {
                let subtree = self
                    .dirs
                    .entry(folder.clone())
                    .or_insert_with(EditTree::empty);

                subtree.update(source, target, oid, mode, rest)?;
                self.dirty = true;

                Ok(())
            }
        }
    }

    /// Remove a non-directory entry, validating digest and mode
    pub fn delete_file(
        &mut self,
        oid: &ObjectId,
        mode: EntryMode,
        filename: &str,
    ) -> anyhow::Result<()> {
        let existing = self
            .files
            .get(filename)
            .ok_or_else(|| anyhow::anyhow!("cannot find the file to delete: {filename}"))?;

        if existing.oid != *oid {
            return Err(anyhow::anyhow!(
                "hash of file in tree {} doesn't match the requested deletion {oid}",
                existing.oid
            ));
        }
        if existing.mode != mode {
            return Err(anyhow::anyhow!(
                "mode of file {} doesn't match the requested deletion {mode}",
                existing.mode
            ));
        }

        debug!(file = filename, "delete file from tree");

        self.files.remove(filename);
        self.dirty = true;

        Ok(())
    }

    /// Remove an entry at a path; empty subtrees are removed from their
    /// parent
    pub fn delete(
        &mut self,
        oid: &ObjectId,
        mode: EntryMode,
        path_segments: &[String],
    ) -> anyhow::Result<()> {
        match path_segments {
            [] => Err(anyhow::anyhow!("zero length path segment for file: {oid}")),
            [filename] => self.delete_file(oid, mode, filename),
            [folder, rest @ ..] => {
                let subtree = self
                    .dirs
                    .get_mut(folder)
                    .ok_or_else(|| anyhow::anyhow!("cannot find folder: {folder}"))?;

                subtree.delete(oid, mode, rest).map_err(|err| {
                    wrap_unless_cancelled(err, || {
                        format!("failed to delete {}", rest.join("/"))
                    })
                })?;
                if subtree.is_empty() {
                    self.dirs.remove(folder);
                }
                self.dirty = true;

                Ok(())
            }
        }
    }

    /// Rebuild the tree from the overlay and write it to the store
    ///
    /// Without pending edits the base tree is returned untouched. Otherwise
    /// the new tree is written, read back from the store, and adopted as
    /// the new base.
    pub fn build_tree(
        &mut self,
        cancel: &CancellationToken,
        target: &Database,
    ) -> anyhow::Result<Tree> {
        if !self.dirty {
            return Ok(self.base_tree.clone());
        }

        self.dirty = false;

        let mut entries = Vec::with_capacity(self.files.len() + self.dirs.len());

        for (name, subtree) in self.dirs.iter_mut() {
            ensure_not_cancelled(cancel)?;

            let built = subtree.build_tree(cancel, target).map_err(|err| {
                wrap_unless_cancelled(err, || format!("failed to build sub tree {name}"))
            })?;

            entries.push(TreeEntry::new(
                name.clone(),
                EntryMode::Directory,
                built.object_id()?,
            ));
        }

        for entry in self.files.values() {
            entries.push(entry.clone());
        }

        Tree::sort_canonical(&mut entries);

        let new_tree = Tree::new(entries);
        let new_oid = target
            .store(&new_tree)
            .context("failed to save new tree")?;

        let new_tree = target
            .parse_object_as_tree(&new_oid)
            .context("failed to reobtain the tree")?;

        debug!(
            old = ?entry_names(&self.base_tree),
            new = ?entry_names(&new_tree),
            "updating tree"
        );
        self.base_tree = new_tree;

        Ok(self.base_tree.clone())
    }
}

fn entry_names(tree: &Tree) -> Vec<&str> {
    tree.entries().iter().map(|e| e.name.as_str()).collect()
}
