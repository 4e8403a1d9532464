//! Pattern-file loader
//!
//! Parses gitignore-like documents into pattern lines: blank lines and `#`
//! comments are ignored, and `!` negation lines are rejected unless the
//! caller opts into dropping them.

use tracing::warn;

/// Extract pattern lines from a pattern-file document
///
/// When `allow_unsupported` is set, `!` lines are dropped with a warning
/// instead of failing the load.
pub fn load_patterns_from_str(
    content: &str,
    allow_unsupported: bool,
) -> anyhow::Result<Vec<String>> {
    let mut patterns = Vec::new();

    for line in content.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('!') {
            if allow_unsupported {
                warn!(pattern = line, "dropping unsupported negation pattern");
                continue;
            }
            return Err(anyhow::anyhow!(
                "negation patterns are not supported: '{line}'"
            ));
        }

        patterns.push(line.to_string());
    }

    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_trimmed_pattern_lines() {
        let content = "src/**/*.rs\n  README.md  \n";
        let patterns = load_patterns_from_str(content, false).unwrap();
        assert_eq!(patterns, vec!["src/**/*.rs", "README.md"]);
    }

    #[test]
    fn skips_blanks_and_comments() {
        let content = "\n# build outputs\n\ntarget/\n   # more\ndocs\n";
        let patterns = load_patterns_from_str(content, false).unwrap();
        assert_eq!(patterns, vec!["target/", "docs"]);
    }

    #[test]
    fn rejects_negations_by_default() {
        let content = "src\n!src/generated\n";
        assert!(load_patterns_from_str(content, false).is_err());
    }

    #[test]
    fn drops_negations_when_allowed() {
        let content = "src\n!src/generated\ndocs\n";
        let patterns = load_patterns_from_str(content, true).unwrap();
        assert_eq!(patterns, vec!["src", "docs"]);
    }
}
