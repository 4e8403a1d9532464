//! Tree diffing
//!
//! Produces the ordered sequence of file-level patches between two trees,
//! consumed by the expansion engine. The walk is deterministic: entries are
//! visited depth-first in byte-lexicographic name order, so the same pair
//! of trees always yields the same patch sequence.

pub mod tree_diff;
