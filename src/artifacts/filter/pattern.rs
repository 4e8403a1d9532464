//! Restricted gitignore-style pattern filter
//!
//! The dialect:
//! - `**` spans any number of directory levels and may appear at most once
//! - `*` and `?` match within a single name segment
//! - a trailing `/` restricts the pattern to directories (and files below them)
//! - a trailing `**` or `**/` is dropped; the remaining fixed prefix then
//!   admits its whole subtree
//! - a leading `/` is dropped; every pattern is anchored at the root
//! - `!` negation lines and backslash escapes are not supported
//!
//! Patterns are compiled once into per-segment glob matchers, so evaluating
//! a path allocates nothing.

use crate::artifacts::filter::{Filter, FilterResult};
use anyhow::Context;
use tracing::debug;

/// Compiled pattern deciding a path with three-valued results
pub struct PatternFilter {
    input_pattern: String,
    segments: Vec<glob::Pattern>,
    multi_level_index: Option<usize>,
    // matches only directories (and files under them)
    is_dir_only: bool,
}

impl PatternFilter {
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        let trimmed = pattern.trim();

        // Drop a trailing "**/" or "**"; the fixed prefix left behind admits
        // its whole subtree. Only a whole trailing segment counts: "a**" has
        // the wildcard embedded in a segment and is rejected below.
        let stripped = Self::strip_trailing_multi_level(trimmed);

        if stripped == "/" || stripped.is_empty() {
            return Err(anyhow::anyhow!("'{trimmed}' is an invalid pattern"));
        }

        debug!(input = pattern, trimmed = stripped, "pattern");

        let is_dir_only = trimmed.ends_with('/');

        let body = stripped.strip_suffix('/').unwrap_or(stripped);
        let body = body.strip_prefix('/').unwrap_or(body);
        if body.is_empty() {
            return Err(anyhow::anyhow!(
                "zero path segments left after trimming: '{trimmed}'"
            ));
        }

        let mut multi_level_index = None;
        let mut segments = Vec::new();
        for (idx, seg) in body.split('/').enumerate() {
            if seg == "**" {
                if multi_level_index.is_some() {
                    return Err(anyhow::anyhow!(
                        "at most one ** segment may appear in a pattern, but '{trimmed}' has more"
                    ));
                }
                multi_level_index = Some(idx);
                // placeholder slot, never matched against a name
                segments.push(glob::Pattern::new("**")?);
            } else if seg.contains("**") {
                return Err(anyhow::anyhow!(
                    "segment '{seg}' contains **, which is invalid"
                ));
            } else if seg.contains('\\') {
                return Err(anyhow::anyhow!(
                    "segment '{seg}' contains an escape, which is invalid"
                ));
            } else {
                segments.push(
                    glob::Pattern::new(seg)
                        .with_context(|| format!("pattern segment '{seg}' is not valid"))?,
                );
            }
        }

        Ok(PatternFilter {
            input_pattern: trimmed.to_string(),
            segments,
            multi_level_index,
            is_dir_only,
        })
    }

    pub fn input_pattern(&self) -> &str {
        &self.input_pattern
    }

    fn strip_trailing_multi_level(pattern: &str) -> &str {
        for suffix in ["**/", "**"] {
            if let Some(rest) = pattern.strip_suffix(suffix) {
                if rest.is_empty() || rest.ends_with('/') {
                    return rest;
                }
                return pattern;
            }
        }
        pattern
    }
}

impl Filter for PatternFilter {
    fn filter(&self, paths: &[String], is_dir: bool) -> FilterResult {
        if paths.is_empty() {
            return FilterResult::Out;
        }

        let Some(multi_level_index) = self.multi_level_index else {
            return non_multi_level(is_dir, paths, &self.segments, self.is_dir_only);
        };

        let before = &self.segments[..multi_level_index];
        let after = &self.segments[multi_level_index + 1..];

        // The fixed prefix is matched against the leading directory
        // segments; everything past it is fair game for the tail.
        let mut predir: &[String] = paths;
        if !is_dir {
            predir = &predir[..predir.len() - 1];
        }
        if predir.len() >= multi_level_index {
            predir = &predir[..multi_level_index];
        }
        let remaining = &paths[predir.len()..];

        match dir_match(predir, before) {
            FilterResult::In => {
                if after.is_empty() {
                    return FilterResult::In;
                }
                if remaining.is_empty() {
                    return FilterResult::DirDive;
                }

                // the multi-level wildcard may swallow any number of leading
                // segments of the remainder
                let mut result = FilterResult::Out;
                for start in 0..remaining.len() {
                    result = result.or(non_multi_level(
                        is_dir,
                        &remaining[start..],
                        after,
                        self.is_dir_only,
                    ));
                    if result == FilterResult::In {
                        return result;
                    }
                }

                if result == FilterResult::Out && is_dir {
                    return FilterResult::DirDive;
                }

                result
            }
            FilterResult::DirDive => {
                if !is_dir || !remaining.is_empty() {
                    FilterResult::Out
                } else {
                    FilterResult::DirDive
                }
            }
            FilterResult::Out => FilterResult::Out,
        }
    }
}

/// Match a path against pattern segments without multi-level wildcards
fn non_multi_level(
    is_dir: bool,
    paths: &[String],
    segments: &[glob::Pattern],
    dir_only: bool,
) -> FilterResult {
    if is_dir {
        return dir_match(paths, segments);
    }

    if dir_only {
        // a file is only in if its parent directory is in
        if dir_match(&paths[..paths.len() - 1], segments) != FilterResult::In {
            FilterResult::Out
        } else {
            FilterResult::In
        }
    } else {
        if paths.len() < segments.len() {
            return FilterResult::Out;
        }
        dir_match(paths, segments)
    }
}

/// Match leading path segments against pattern segments
///
/// - `In` when every pattern segment matches its path segment and the path
///   is at least as long as the pattern
/// - `DirDive` when the path is shorter but matches as far as it goes
/// - `Out` otherwise
fn dir_match(paths: &[String], segments: &[glob::Pattern]) -> FilterResult {
    if paths.is_empty() || segments.is_empty() {
        return FilterResult::Out;
    }

    if paths.len() >= segments.len() {
        for (segment, name) in segments.iter().zip(paths) {
            if !segment.matches(name) {
                return FilterResult::Out;
            }
        }
        FilterResult::In
    } else {
        for (name, segment) in paths.iter().zip(segments) {
            if !segment.matches(name) {
                return FilterResult::Out;
            }
        }
        FilterResult::DirDive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    fn eval(pattern: &str, path: &str, is_dir: bool) -> FilterResult {
        let filter = PatternFilter::new(pattern).expect("valid pattern");
        filter.filter(&segs(path), is_dir)
    }

    // ========== Construction Tests ==========

    #[test]
    fn rejects_degenerate_patterns() {
        for pattern in ["", "  ", "/", "**", "/**", "**/"] {
            assert!(PatternFilter::new(pattern).is_err(), "pattern: {pattern:?}");
        }
    }

    #[test]
    fn rejects_second_multi_level_segment() {
        assert!(PatternFilter::new("a/**/b/**/c").is_err());
    }

    #[test]
    fn rejects_multi_level_embedded_in_a_segment() {
        assert!(PatternFilter::new("a**").is_err());
        assert!(PatternFilter::new("a/x**y/b").is_err());
    }

    #[test]
    fn rejects_escapes_and_malformed_globs() {
        assert!(PatternFilter::new("src/back\\slash").is_err());
        assert!(PatternFilter::new("src/[oops").is_err());
    }

    #[test]
    fn accepts_whitespace_padded_patterns() {
        assert_eq!(eval("  LICENSE  ", "LICENSE", false), FilterResult::In);
    }

    // ========== Plain Pattern Tests ==========

    #[test]
    fn exact_file_pattern() {
        assert_eq!(eval("src/*.rs", "src/main.rs", false), FilterResult::In);
        assert_eq!(eval("src/*.rs", "src/deep/x.rs", false), FilterResult::Out);
        assert_eq!(eval("src/*.rs", "main.rs", false), FilterResult::Out);
    }

    #[test]
    fn directory_prefix_dives() {
        assert_eq!(eval("src/*.rs", "src", true), FilterResult::DirDive);
        assert_eq!(eval("src/*.rs", "docs", true), FilterResult::Out);
    }

    #[test]
    fn leading_slash_is_ignored() {
        assert_eq!(eval("/LICENSE", "LICENSE", false), FilterResult::In);
    }

    #[test]
    fn pattern_admits_files_below_its_final_segment() {
        // "a/b" may name a directory, so files under it are in
        assert_eq!(eval("a/b", "a/b/c.txt", false), FilterResult::In);
    }

    #[test]
    fn question_mark_matches_exactly_one_character() {
        assert_eq!(eval("f?o.txt", "foo.txt", false), FilterResult::In);
        assert_eq!(eval("f?o.txt", "fo.txt", false), FilterResult::Out);
    }

    // ========== Directory-Only Tests ==========

    #[test]
    fn dir_only_pattern_admits_files_below_the_directory() {
        assert_eq!(eval("build/", "build/out.o", false), FilterResult::In);
        assert_eq!(eval("build/", "build", true), FilterResult::In);
    }

    #[test]
    fn dir_only_pattern_rejects_a_plain_file_of_that_name() {
        assert_eq!(eval("build/", "build", false), FilterResult::Out);
    }

    // ========== Trailing Multi-Level Tests ==========

    #[test]
    fn trailing_multi_level_reduces_to_fixed_prefix() {
        assert_eq!(eval("a/**", "a/b/c", false), FilterResult::In);
        assert_eq!(eval("a/**", "a", true), FilterResult::In);
        assert_eq!(eval("a/**", "x", false), FilterResult::Out);
    }

    // ========== Multi-Level Tests ==========

    #[test]
    fn multi_level_with_tail_matches_at_any_depth() {
        let pattern = "aptos/**/*.js";
        assert_eq!(eval(pattern, "aptos/test/test.js", false), FilterResult::In);
        assert_eq!(eval(pattern, "aptos/a/b/c/d.js", false), FilterResult::In);
        assert_eq!(eval(pattern, "other/test.js", false), FilterResult::Out);
    }

    #[test]
    fn multi_level_dives_into_matching_directories() {
        assert_eq!(eval("aptos/**/*.js", "aptos/test", true), FilterResult::DirDive);
        assert_eq!(eval("aptos/**/*.js", "aptos", true), FilterResult::DirDive);
    }

    #[test]
    fn multi_level_prefix_partial_match_dives_on_directories_only() {
        let pattern = "a/b/**/*.js";
        assert_eq!(eval(pattern, "a", true), FilterResult::DirDive);
        assert_eq!(eval(pattern, "a/x.js", false), FilterResult::Out);
    }

    #[test]
    fn multi_level_rejects_files_outside_the_prefix() {
        assert_eq!(eval("src/**/*.js", "docs/a.js", false), FilterResult::Out);
    }

    #[test]
    fn multi_level_tail_can_match_directly_after_prefix() {
        // ** may swallow zero levels
        assert_eq!(eval("src/**/*.js", "src/app.js", false), FilterResult::In);
    }
}
