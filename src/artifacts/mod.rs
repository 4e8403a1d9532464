//! Core data structures and algorithms
//!
//! - `core`: Cancellation token plumbing and error helpers
//! - `diff`: Deterministic tree diffing (file-level patches)
//! - `expand`: Re-applying filtered diffs onto unfiltered targets
//! - `filter`: Three-valued path filters and the pattern dialect
//! - `objects`: Object types (blob, tree, commit) and serialization
//! - `rewrite`: Tree/commit filtering and the linear-history driver

pub mod core;
pub mod diff;
pub mod expand;
pub mod filter;
pub mod objects;
pub mod rewrite;
