//! Path filters with three-valued results
//!
//! A filter is a pure decision over a path: keep it (`In`), drop it
//! (`Out`), or — for directories — descend and decide entry by entry
//! (`DirDive`). The three-valued lattice is what lets the tree rewriter
//! prune a whole subtree on `Out` and copy a whole subtree on `In` without
//! ever descending into it.
//!
//! - `cached`: Memoizing wrapper around any filter
//! - `compose`: `Or` / `And` combinators over the lattice
//! - `loader`: Pattern-file parsing (gitignore-like documents)
//! - `pattern`: The restricted gitignore pattern dialect

pub mod cached;
pub mod compose;
pub mod loader;
pub mod pattern;

/// Decision of a filter for one path
///
/// The variants form a lattice ordered `Out < DirDive < In`; the `or` of
/// several results is their maximum and the `and` their minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterResult {
    /// The path is excluded; for a directory, the entire subtree is excluded
    Out,
    /// The path is a directory whose entries must be examined individually
    DirDive,
    /// The path is included; for a directory, the entire subtree is included
    In,
}

impl FilterResult {
    pub fn is_in(&self) -> bool {
        matches!(self, FilterResult::In)
    }

    /// `or` over the lattice (maximum)
    pub fn or(self, other: FilterResult) -> FilterResult {
        self.max(other)
    }

    /// `and` over the lattice (minimum)
    pub fn and(self, other: FilterResult) -> FilterResult {
        self.min(other)
    }
}

impl std::fmt::Display for FilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterResult::Out => "Out",
            FilterResult::DirDive => "DirDive",
            FilterResult::In => "In",
        };
        write!(f, "{name}")
    }
}

/// Decision function over paths
///
/// `paths` is the sequence of name segments from the repository root and
/// `is_dir` says whether the decision target is a directory. Implementors
/// must be pure: the same input always yields the same result.
pub trait Filter {
    fn filter(&self, paths: &[String], is_dir: bool) -> FilterResult;
}

/// Run a filter on a `/`-joined path string
pub fn filter_path(filter: &dyn Filter, full_path: &str, is_dir: bool) -> FilterResult {
    let segments: Vec<String> = full_path.split('/').map(str::to_string).collect();
    filter.filter(&segments, is_dir)
}

/// Filter admitting every path
pub struct TrueFilter;

impl Filter for TrueFilter {
    fn filter(&self, _paths: &[String], _is_dir: bool) -> FilterResult {
        FilterResult::In
    }
}

/// Legacy filter over the `/`-prefixed full-path string
///
/// Admits a path exactly when `"/" + joined_path` starts with the
/// configured prefix. Kept for the expansion entry point, which only ever
/// asks about file paths; it makes no attempt at directory dive decisions.
pub struct PrefixFilter {
    prefix: String,
}

impl PrefixFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        PrefixFilter {
            prefix: prefix.into(),
        }
    }
}

impl Filter for PrefixFilter {
    fn filter(&self, paths: &[String], _is_dir: bool) -> FilterResult {
        let full = format!("/{}", paths.join("/"));
        if full.starts_with(&self.prefix) {
            FilterResult::In
        } else {
            FilterResult::Out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    // ========== Lattice Tests ==========

    #[test]
    fn lattice_or_takes_the_maximum() {
        assert_eq!(
            FilterResult::Out.or(FilterResult::In),
            FilterResult::In
        );
        assert_eq!(
            FilterResult::Out.or(FilterResult::DirDive),
            FilterResult::DirDive
        );
        assert_eq!(
            FilterResult::DirDive.or(FilterResult::In),
            FilterResult::In
        );
    }

    #[test]
    fn lattice_and_takes_the_minimum() {
        assert_eq!(
            FilterResult::Out.and(FilterResult::In),
            FilterResult::Out
        );
        assert_eq!(
            FilterResult::Out.and(FilterResult::DirDive),
            FilterResult::Out
        );
        assert_eq!(
            FilterResult::DirDive.and(FilterResult::In),
            FilterResult::DirDive
        );
    }

    // ========== TrueFilter / PrefixFilter Tests ==========

    #[test]
    fn true_filter_admits_everything() {
        assert!(TrueFilter.filter(&segs("any/path"), false).is_in());
        assert!(TrueFilter.filter(&segs("any"), true).is_in());
    }

    #[test]
    fn prefix_filter_matches_full_path_string() {
        let filter = PrefixFilter::new("/README.md");

        assert_eq!(filter.filter(&segs("README.md"), false), FilterResult::In);
        assert_eq!(filter.filter(&segs("LICENSE"), false), FilterResult::Out);
    }

    #[test]
    fn prefix_filter_uses_plain_string_semantics() {
        let filter = PrefixFilter::new("/READ");

        // string prefix, not a path-segment prefix
        assert_eq!(filter.filter(&segs("README.md"), false), FilterResult::In);
    }

    #[test]
    fn filter_path_splits_on_slashes() {
        let filter = PrefixFilter::new("/src/lib.rs");
        assert_eq!(
            filter_path(&filter, "src/lib.rs", false),
            FilterResult::In
        );
    }
}
