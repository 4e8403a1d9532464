//! Memoizing filter wrapper
//!
//! History rewrites ask the same path questions over and over (every commit
//! revisits mostly-unchanged trees), so the outermost filter used by the
//! command-line wrappers memoizes results keyed by the joined path string.
//! Sound only because filters are pure. The cache is not safe to share
//! across threads.

use crate::artifacts::filter::{Filter, FilterResult};
use std::cell::RefCell;
use std::collections::HashMap;

/// Filter wrapper memoizing results per joined path
///
/// Directory and non-directory decisions are cached separately because the
/// same path string can legitimately receive different answers for the two.
pub struct CachedFilter {
    inner: Box<dyn Filter>,

    dir_cache: RefCell<HashMap<String, FilterResult>>,
    non_dir_cache: RefCell<HashMap<String, FilterResult>>,
}

impl CachedFilter {
    pub fn new(inner: Box<dyn Filter>) -> Self {
        CachedFilter {
            inner,
            dir_cache: RefCell::new(HashMap::new()),
            non_dir_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Drop every memoized result
    pub fn reset(&self) {
        self.dir_cache.borrow_mut().clear();
        self.non_dir_cache.borrow_mut().clear();
    }
}

impl Filter for CachedFilter {
    fn filter(&self, paths: &[String], is_dir: bool) -> FilterResult {
        let cache = if is_dir {
            &self.dir_cache
        } else {
            &self.non_dir_cache
        };

        let name = paths.join("/");
        if let Some(result) = cache.borrow().get(&name) {
            return *result;
        }

        let result = self.inner.filter(paths, is_dir);
        cache.borrow_mut().insert(name, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Filter counting how often it is consulted
    struct CountingFilter {
        calls: Rc<Cell<usize>>,
    }

    impl Filter for CountingFilter {
        fn filter(&self, _paths: &[String], _is_dir: bool) -> FilterResult {
            self.calls.set(self.calls.get() + 1);
            FilterResult::In
        }
    }

    fn segs(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let calls = Rc::new(Cell::new(0));
        let filter = CachedFilter::new(Box::new(CountingFilter {
            calls: Rc::clone(&calls),
        }));

        filter.filter(&segs("a/b"), false);
        filter.filter(&segs("a/b"), false);
        filter.filter(&segs("a/b"), false);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn directory_and_file_decisions_are_cached_separately() {
        let calls = Rc::new(Cell::new(0));
        let filter = CachedFilter::new(Box::new(CountingFilter {
            calls: Rc::clone(&calls),
        }));

        filter.filter(&segs("a/b"), false);
        filter.filter(&segs("a/b"), true);

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn reset_clears_both_caches() {
        let calls = Rc::new(Cell::new(0));
        let filter = CachedFilter::new(Box::new(CountingFilter {
            calls: Rc::clone(&calls),
        }));

        filter.filter(&segs("a"), false);
        filter.filter(&segs("a"), true);
        filter.reset();
        filter.filter(&segs("a"), false);
        filter.filter(&segs("a"), true);

        assert_eq!(calls.get(), 4);
    }
}
