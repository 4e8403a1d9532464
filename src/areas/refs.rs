//! Reference management
//!
//! Minimal reference support for the command-line wrappers: resolving
//! `HEAD` (following `ref:` indirection) to find the input head commit, and
//! pointing a branch (and optionally `HEAD`) at the rewritten history. The
//! core rewriters never touch references.

use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Reference manager rooted at a repository's `.git` directory
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory holding `HEAD` and `refs/`
    path: Box<Path>,
}

impl Refs {
    /// Resolve `HEAD` to a commit digest, following symbolic indirection
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_ref(HEAD_REF_NAME)
    }

    /// Resolve a reference by name (`HEAD` or `refs/heads/<branch>`)
    pub fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        self.resolve(&self.path.join(name), 0)
    }

    fn resolve(&self, path: &Path, depth: usize) -> anyhow::Result<Option<ObjectId>> {
        if depth > 5 {
            return Err(anyhow::anyhow!(
                "reference chain too deep at {}",
                path.display()
            ));
        }
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .context(format!("unable to read ref file {}", path.display()))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        match content.strip_prefix("ref: ") {
            Some(target) => self.resolve(&self.path.join(target.trim()), depth + 1),
            None => Ok(Some(ObjectId::try_parse(content.to_string())?)),
        }
    }

    /// Point a branch at a commit, creating the ref file if needed
    ///
    /// The write happens under an exclusive file lock so concurrent CLI
    /// invocations cannot interleave partial ref contents.
    pub fn update_branch(&self, branch: &str, oid: &ObjectId) -> anyhow::Result<()> {
        let ref_path = self.branch_path(branch);
        std::fs::create_dir_all(
            ref_path
                .parent()
                .context(format!("invalid ref path {}", ref_path.display()))?,
        )?;

        let mut ref_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&ref_path)
            .context(format!("unable to open ref file {}", ref_path.display()))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;

        lock.deref_mut()
            .write_all(format!("{}\n", oid.as_ref()).as_bytes())
            .context(format!("unable to write ref file {}", ref_path.display()))?;

        Ok(())
    }

    /// Make `HEAD` a symbolic reference to the given branch
    pub fn set_head_to_branch(&self, branch: &str) -> anyhow::Result<()> {
        let head_path = self.path.join(HEAD_REF_NAME);

        let mut head_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&head_path)
            .context(format!("unable to open HEAD at {}", head_path.display()))?;
        let mut lock = file_guard::lock(&mut head_file, Lock::Exclusive, 0, 1)?;

        lock.deref_mut()
            .write_all(format!("ref: refs/heads/{branch}\n").as_bytes())
            .context("unable to write HEAD")?;

        Ok(())
    }

    fn branch_path(&self, branch: &str) -> PathBuf {
        self.path.join("refs").join("heads").join(branch)
    }
}
