//! Route pattern matching logic.
//!
//! # Responsibilities
//! - Compile literal route patterns (`/`, `/sign-in*`, `/api(.*)`)
//! - Match a request path against one pattern
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A trailing `*` (or `(.*)`) means "prefix + arbitrary suffix"
//! - Wildcards anywhere else are rejected at compile time
//! - No regex to guarantee O(n) matching

use std::fmt;

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Reasons a route pattern fails to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("empty route pattern")]
    Empty,

    #[error("route pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("route pattern `{0}` may only use a wildcard at the end")]
    InteriorWildcard(String),
}

/// A single compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Matches the path exactly.
    Exact(String),
    /// Matches any path starting with the prefix.
    Prefix(String),
}

impl RoutePattern {
    /// Compile a pattern from its configured literal form.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_string()));
        }

        let (body, wildcard) = if let Some(prefix) = raw.strip_suffix("(.*)") {
            (prefix, true)
        } else if let Some(prefix) = raw.strip_suffix('*') {
            (prefix, true)
        } else {
            (raw, false)
        };

        if body.contains('*') || body.contains("(.*)") {
            return Err(PatternError::InteriorWildcard(raw.to_string()));
        }

        Ok(if wildcard {
            Self::Prefix(body.to_string())
        } else {
            Self::Exact(body.to_string())
        })
    }
}

impl Matcher for RoutePattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(expected) => path == expected,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => f.write_str(path),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let pattern = RoutePattern::parse("/").unwrap();
        assert_eq!(pattern, RoutePattern::Exact("/".into()));
        assert!(pattern.matches("/"));
        assert!(!pattern.matches("/dashboard"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn test_prefix_pattern() {
        let pattern = RoutePattern::parse("/sign-in*").unwrap();
        assert!(pattern.matches("/sign-in"));
        assert!(pattern.matches("/sign-in/factor-one"));
        assert!(!pattern.matches("/sign-up"));
        assert!(!pattern.matches("/SIGN-IN")); // Case sensitive
    }

    #[test]
    fn test_regex_style_suffix_is_prefix() {
        let pattern = RoutePattern::parse("/api(.*)").unwrap();
        assert_eq!(pattern, RoutePattern::Prefix("/api".into()));
        assert!(pattern.matches("/api/projects/7"));
        assert_eq!(pattern.to_string(), "/api*");
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(RoutePattern::parse("  "), Err(PatternError::Empty));
        assert_eq!(
            RoutePattern::parse("api*"),
            Err(PatternError::MissingLeadingSlash("api*".into()))
        );
        assert_eq!(
            RoutePattern::parse("/api/*/v1"),
            Err(PatternError::InteriorWildcard("/api/*/v1".into()))
        );
        assert_eq!(
            RoutePattern::parse("/a**"),
            Err(PatternError::InteriorWildcard("/a**".into()))
        );
    }
}
