//! Deterministic history rewriting for content-addressed repositories
//!
//! gitsieve rewrites a linear {blob, tree, commit} history so that every
//! tree contains only paths admitted by a set of patterns. The rewrite is
//! deterministic: identical inputs produce byte-identical outputs, digests
//! included. The inverse operation re-applies the diff between two
//! filtered commits onto an unfiltered base, and an auxiliary rewrite
//! strips signature blocks from commits while preserving everything else.
//!
//! The input history must be linear (merge commits are an error),
//! submodules are logged and skipped, and signature blocks never survive
//! a rewrite.

pub mod areas;
pub mod artifacts;
