//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → patterns.rs (public / api group lookup)
//!     → matcher.rs (evaluate single patterns)
//!     → Return: which group, if any, the path belongs to
//!
//! Pattern Compilation (at startup and on reload):
//!     RoutesConfig
//!     → Compile matchers (exact / prefix)
//!     → Freeze as immutable RoutePatterns
//! ```
//!
//! # Design Decisions
//! - Patterns compiled up front, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always lands in the same group

pub mod matcher;
pub mod patterns;

pub use matcher::{Matcher, PatternError, RoutePattern};
pub use patterns::{PatternSet, RoutePatterns};
