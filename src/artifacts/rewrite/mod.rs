//! History rewriting
//!
//! The deterministic rewrite pipeline:
//!
//! - `tree_filter`: Recursively filter one tree into an output store
//! - `tree_copy`: Copy a whole subtree verbatim into an output store
//! - `commit_filter`: Filter one commit, collapsing into its parent when
//!   the filtered tree is unchanged
//! - `history`: Linear-history retrieval and the oldest-first driver
//! - `sign_strip`: Rebuild a history with signature blocks dropped
//! - `tree_dump`: Print the filtered listing of a tree
//!
//! Object writes happen in post-order (children before parents), so an
//! output store is self-consistent whenever a rewrite exits cleanly.

pub mod commit_filter;
pub mod history;
pub mod sign_strip;
pub mod tree_copy;
pub mod tree_dump;
pub mod tree_filter;
