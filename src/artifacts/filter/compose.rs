//! Filter combinators over the result lattice

use crate::artifacts::filter::cached::CachedFilter;
use crate::artifacts::filter::pattern::PatternFilter;
use crate::artifacts::filter::{Filter, FilterResult, PrefixFilter};

/// Union of filters: a path is kept if any child keeps it
///
/// The result is the lattice maximum of the children, short-circuiting as
/// soon as one of them answers `In`. An empty union rejects everything.
pub struct OrFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl OrFilter {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        OrFilter { filters }
    }

    pub fn add(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Compile a pattern list into a memoized union filter
    pub fn for_patterns<I, S>(patterns: I) -> anyhow::Result<CachedFilter>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters: Vec<Box<dyn Filter>> = Vec::new();
        for pattern in patterns {
            filters.push(Box::new(PatternFilter::new(pattern.as_ref())?));
        }

        Ok(CachedFilter::new(Box::new(OrFilter::new(filters))))
    }

    /// Build a union of legacy prefix filters
    pub fn for_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        OrFilter::new(
            prefixes
                .into_iter()
                .map(|prefix| Box::new(PrefixFilter::new(prefix.as_ref())) as Box<dyn Filter>)
                .collect(),
        )
    }
}

impl Filter for OrFilter {
    fn filter(&self, paths: &[String], is_dir: bool) -> FilterResult {
        let mut result = FilterResult::Out;
        for filter in &self.filters {
            result = result.or(filter.filter(paths, is_dir));
            if result == FilterResult::In {
                break;
            }
        }

        result
    }
}

/// Intersection of filters: a path is kept only if every child keeps it
///
/// The result is the lattice minimum of the children, short-circuiting as
/// soon as one of them answers `Out`. An empty intersection rejects
/// everything.
pub struct AndFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AndFilter {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        AndFilter { filters }
    }

    pub fn add(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }
}

impl Filter for AndFilter {
    fn filter(&self, paths: &[String], is_dir: bool) -> FilterResult {
        let mut filters = self.filters.iter();
        let mut result = match filters.next() {
            Some(filter) => filter.filter(paths, is_dir),
            None => return FilterResult::Out,
        };

        for filter in filters {
            if result == FilterResult::Out {
                break;
            }
            result = result.and(filter.filter(paths, is_dir));
        }

        result
    }
}
