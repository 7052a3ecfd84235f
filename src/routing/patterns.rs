//! Route pattern groups.
//!
//! # Responsibilities
//! - Store compiled public and API patterns
//! - Answer "is this path public / api" for the gatekeeper
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Order-independent: any matching pattern wins
//! - O(n) scan over patterns (acceptable for typical route counts)

use crate::config::RoutesConfig;
use crate::routing::matcher::{Matcher, PatternError, RoutePattern};

/// An unordered set of route patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<RoutePattern>,
}

impl PatternSet {
    /// Compile every literal, failing on the first invalid one.
    pub fn parse<I, S>(raw: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = raw
            .into_iter()
            .map(|p| RoutePattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Matcher for PatternSet {
    fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// The public and API pattern groups the gatekeeper classifies against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePatterns {
    pub public: PatternSet,
    pub api: PatternSet,
}

impl RoutePatterns {
    pub fn new(public: PatternSet, api: PatternSet) -> Self {
        Self { public, api }
    }

    /// Compile both groups from configuration.
    pub fn from_config(config: &RoutesConfig) -> Result<Self, PatternError> {
        Ok(Self {
            public: PatternSet::parse(&config.public_routes)?,
            api: PatternSet::parse(&config.api_routes)?,
        })
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.matches(path)
    }

    pub fn is_api(&self, path: &str) -> bool {
        self.api.matches(path)
    }
}
