//! Public path allowlist.
//!
//! Patterns ending in `/**` match the prefix itself and anything below it.
//! Every other pattern matches exactly.

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        match pattern.strip_suffix("/**") {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Paths that skip authentication and header logging.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    patterns: Vec<PathPattern>,
}

impl PublicPaths {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| p.as_ref())
                .filter(|p| !p.trim().is_empty())
                .map(PathPattern::parse)
                .collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;

    fn defaults() -> PublicPaths {
        PublicPaths::new(&SecurityConfig::default().public_paths)
    }

    #[test]
    fn test_prefix_patterns() {
        let paths = defaults();
        assert!(paths.matches("/actuator"));
        assert!(paths.matches("/actuator/health"));
        assert!(paths.matches("/actuator/prometheus"));
        assert!(paths.matches("/swagger-ui/index.html"));
        assert!(paths.matches("/v3/api-docs/books"));
    }

    #[test]
    fn test_prefix_does_not_match_sibling() {
        let paths = defaults();
        assert!(!paths.matches("/actuatorx"));
        assert!(!paths.matches("/actuator-admin/health"));
    }

    #[test]
    fn test_exact_patterns() {
        let paths = defaults();
        assert!(paths.matches("/error"));
        assert!(paths.matches("/swagger-ui.html"));
        assert!(!paths.matches("/error/details"));
    }

    #[test]
    fn test_api_paths_are_protected() {
        let paths = defaults();
        assert!(!paths.matches("/api/books"));
        assert!(!paths.matches("/"));
    }

    #[test]
    fn test_blank_patterns_are_ignored() {
        let paths = PublicPaths::new(&["", "  "]);
        assert!(!paths.matches(""));
    }
}
